use std::sync::Arc;

use keel_cache::CachePool;
use keel_core::{ConfigError, ConfigProperties, KeelConfig};

use crate::catalog::EntityCatalog;
use crate::config::OrmConfig;
use crate::declaration::EntityDeclaration;
use crate::driver::Driver;
use crate::entity::Entity;
use crate::error::{DataError, MappingError};
use crate::manager::EntityManager;
use crate::mapping::{ClassMetadata, NamingStrategy};
use crate::metadata::{
    ClassMetadataFactory, CompileReport, MetadataCompiler, RelationFactoryChain, RelationMetadataFactory,
};
use crate::query::QueryFactory;
use crate::registry::SchemaRegistry;
use crate::types::{TypeInterface, TypeRegistry};

/// Builder for an [`Orm`].
///
/// ```ignore
/// let orm = Orm::builder()
///     .config(OrmConfig::from_config(&config)?)
///     .cache(CachePool::new(Arc::new(FileStore::open("var/cache")?), "orm"))
///     .register::<User>()
///     .register::<Post>()
///     .build()?;
/// ```
pub struct OrmBuilder {
    config: OrmConfig,
    pool: Option<CachePool>,
    catalog: EntityCatalog,
    types: TypeRegistry,
    type_errors: Vec<MappingError>,
    naming: Option<Arc<dyn NamingStrategy>>,
    relations: RelationFactoryChain,
}

impl Default for OrmBuilder {
    fn default() -> Self {
        Self {
            config: OrmConfig::default(),
            pool: None,
            catalog: EntityCatalog::new(),
            types: TypeRegistry::with_defaults(),
            type_errors: Vec::new(),
            naming: None,
            relations: RelationFactoryChain::default(),
        }
    }
}

impl OrmBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the `orm` section of a loaded configuration.
    pub fn from_config<T>(config: &KeelConfig<T>) -> Result<Self, ConfigError> {
        Ok(Self::new().config(OrmConfig::from_config(&config.raw())?))
    }

    pub fn config(mut self, config: OrmConfig) -> Self {
        self.config = config;
        self
    }

    /// Back the schema registry with `pool`. Defaults to an in-memory pool.
    pub fn cache(mut self, pool: CachePool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn register<T: Entity>(mut self) -> Self {
        self.catalog.register::<T>();
        self
    }

    pub fn declare(mut self, declaration: EntityDeclaration) -> Self {
        self.catalog.declare(declaration);
        self
    }

    /// Record a class name found by discovery; it must be declared before
    /// [`OrmBuilder::build`].
    pub fn discover(mut self, class: impl Into<String>) -> Self {
        self.catalog.discover(class);
        self
    }

    /// Register a custom type. A duplicate name fails the build.
    pub fn with_type(mut self, ty: impl TypeInterface) -> Self {
        if let Err(err) = self.types.register(ty) {
            self.type_errors.push(err);
        }
        self
    }

    pub fn naming(mut self, naming: impl NamingStrategy) -> Self {
        self.naming = Some(Arc::new(naming));
        self
    }

    /// Consult `factory` before the built-in relation factories.
    pub fn relation_factory(mut self, factory: impl RelationMetadataFactory + 'static) -> Self {
        self.relations = self.relations.with_first(factory);
        self
    }

    /// Compile the metadata of every registered entity.
    pub fn build(self) -> Result<Orm, DataError> {
        if let Some(err) = self.type_errors.into_iter().next() {
            return Err(err.into());
        }
        let registry = Arc::new(SchemaRegistry::new(
            self.pool.unwrap_or_else(|| CachePool::in_memory("orm")),
        ));
        let types = Arc::new(self.types);
        let mut compiler = MetadataCompiler::new(types.clone(), self.config.clone()).with_relations(self.relations);
        if let Some(naming) = self.naming {
            compiler = compiler.with_naming(naming);
        }
        let metadata = ClassMetadataFactory::new(self.catalog, registry.clone(), compiler);
        let report = metadata.compile()?;
        tracing::info!(
            built = report.built.len(),
            cached = report.cached.len(),
            connections = report.connections,
            "Entity metadata ready"
        );
        Ok(Orm {
            registry,
            types,
            config: self.config,
            metadata,
            report,
        })
    }
}

/// Compiled entity metadata plus the services built on it.
#[derive(Debug)]
pub struct Orm {
    registry: Arc<SchemaRegistry>,
    types: Arc<TypeRegistry>,
    config: OrmConfig,
    metadata: ClassMetadataFactory,
    report: CompileReport,
}

impl Orm {
    pub fn builder() -> OrmBuilder {
        OrmBuilder::new()
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    pub fn config(&self) -> &OrmConfig {
        &self.config
    }

    /// Report of the compilation run by [`OrmBuilder::build`].
    pub fn report(&self) -> &CompileReport {
        &self.report
    }

    pub fn class_metadata(&self, class: &str) -> Result<Option<Arc<ClassMetadata>>, DataError> {
        self.metadata.get_class_metadata(class)
    }

    pub fn all_class_metadata(&self) -> Result<Vec<Arc<ClassMetadata>>, DataError> {
        self.metadata.get_all_class_metadata()
    }

    /// A query factory rendering for the configured dialect.
    pub fn query_factory(&self) -> QueryFactory {
        QueryFactory::new(self.registry.clone(), self.types.clone(), self.config.dialect)
    }

    pub fn entity_manager<D: Driver>(&self, driver: D) -> EntityManager<D> {
        EntityManager::new(driver, self.registry.clone(), self.types.clone(), self.config.clone())
    }
}
