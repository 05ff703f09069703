use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::driver::Driver;
use crate::entity::Entity;
use crate::error::DataError;
use crate::manager::EntityManager;
use crate::page::{Page, Pageable};
use crate::query::{Arguments, State};
use crate::value::Value;

/// Generic async repository trait for CRUD operations.
///
/// Uses RPITIT (return-position `impl Trait` in traits), so no `async-trait` is needed.
pub trait Repository<T, ID>: Send + Sync
where
    T: Send + Sync + 'static,
    ID: Send + Sync + 'static,
{
    fn find_by_id(&self, id: &ID) -> impl Future<Output = Result<Option<T>, DataError>> + Send;
    fn find_all(&self) -> impl Future<Output = Result<Vec<T>, DataError>> + Send;
    fn find_all_paged(&self, pageable: &Pageable) -> impl Future<Output = Result<Page<T>, DataError>> + Send;
    fn save(&self, entity: &T) -> impl Future<Output = Result<T, DataError>> + Send;
    fn delete(&self, id: &ID) -> impl Future<Output = Result<bool, DataError>> + Send;
    fn count(&self) -> impl Future<Output = Result<u64, DataError>> + Send;
}

/// A [`Repository`] for any compiled entity, backed by an [`EntityManager`].
///
/// `ID` is the primary key type accepted by `find_by_id` and `delete`.
///
/// # Example
///
/// ```ignore
/// let users: EntityRepository<User, SqliteDriver> = EntityRepository::new(manager.clone());
/// let ada = users.find_by_id(&1).await?;
/// ```
pub struct EntityRepository<T, D, ID = i64> {
    manager: Arc<EntityManager<D>>,
    _marker: PhantomData<fn() -> (T, ID)>,
}

impl<T, D, ID> Clone for EntityRepository<T, D, ID> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity, D: Driver, ID> EntityRepository<T, D, ID> {
    pub fn new(manager: Arc<EntityManager<D>>) -> Self {
        Self {
            manager,
            _marker: PhantomData,
        }
    }

    pub fn manager(&self) -> &EntityManager<D> {
        &self.manager
    }

    fn key_state(&self, key: Value) -> Result<State, DataError> {
        let metadata = self.manager.registry().entity(T::class_name())?;
        Ok(State::new().with(metadata.entity().primary_field().property.clone(), key))
    }

    pub async fn find_by(&self, state: &State, args: &Arguments) -> Result<Vec<T>, DataError> {
        self.manager.find_by(state, args).await
    }

    pub async fn find_one_by(&self, state: &State) -> Result<Option<T>, DataError> {
        self.manager.find_one_by(state).await
    }
}

impl<T, D, ID> Repository<T, ID> for EntityRepository<T, D, ID>
where
    T: Entity,
    D: Driver,
    ID: Clone + Into<Value> + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: &ID) -> Result<Option<T>, DataError> {
        let state = self.key_state(id.clone().into())?;
        self.manager.find_one_by(&state).await
    }

    async fn find_all(&self) -> Result<Vec<T>, DataError> {
        self.manager.find_by(&State::new(), &Arguments::new()).await
    }

    async fn find_all_paged(&self, pageable: &Pageable) -> Result<Page<T>, DataError> {
        let args = pageable.to_arguments()?;
        let collection = self.manager.find(T::class_name(), &State::new(), &args).await?;
        let total = collection.total_count;
        Ok(Page::new(collection.into_typed()?, pageable, total))
    }

    async fn save(&self, entity: &T) -> Result<T, DataError> {
        self.manager.save(entity).await
    }

    async fn delete(&self, id: &ID) -> Result<bool, DataError> {
        let state = self.key_state(id.clone().into())?;
        Ok(self.manager.delete(T::class_name(), &state, &Arguments::new()).await? > 0)
    }

    async fn count(&self) -> Result<u64, DataError> {
        self.manager.count(T::class_name(), &State::new()).await
    }
}
