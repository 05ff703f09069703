//! Metadata compilation.
//!
//! A pass runs in two phases over private builders: [`build_entity`] maps each
//! declared class to fields and indexes, then the [`RelationFactoryChain`]
//! adds foreign keys, junction entities and connections. Only then are the
//! frozen definitions written to the [`SchemaRegistry`].

mod builder;
mod context;
pub mod relation;

pub use builder::build_entity;
pub use context::CompilationContext;
pub use relation::{
    ManyToManyFactory, OneToManyFactory, PropertyRef, RelationFactoryChain, RelationMetadataFactory,
};

use std::sync::{Arc, Mutex, PoisonError};

use crate::catalog::{entity_attribute, EntityCatalog};
use crate::config::OrmConfig;
use crate::error::DataError;
use crate::mapping::{ClassMetadata, DefaultNamingStrategy, EntityBuilder, NamingStrategy};
use crate::registry::SchemaRegistry;
use crate::types::TypeRegistry;

/// What a compilation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    /// Classes built from their declarations.
    pub built: Vec<String>,
    /// Classes served from the registry.
    pub cached: Vec<String>,
    /// Classes written to the registry, junctions included.
    pub saved: Vec<String>,
    pub connections: usize,
}

impl CompileReport {
    pub fn is_warm(&self) -> bool {
        self.built.is_empty()
    }
}

pub struct MetadataCompiler {
    types: Arc<TypeRegistry>,
    naming: Arc<dyn NamingStrategy>,
    relations: RelationFactoryChain,
    config: OrmConfig,
}

impl std::fmt::Debug for MetadataCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCompiler")
            .field("relations", &self.relations)
            .field("config", &self.config)
            .finish()
    }
}

impl MetadataCompiler {
    pub fn new(types: Arc<TypeRegistry>, config: OrmConfig) -> Self {
        Self {
            types,
            naming: Arc::new(DefaultNamingStrategy),
            relations: RelationFactoryChain::default(),
            config,
        }
    }

    pub fn with_naming(mut self, naming: Arc<dyn NamingStrategy>) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_relations(mut self, relations: RelationFactoryChain) -> Self {
        self.relations = relations;
        self
    }

    /// Compile every discovered class not yet in the registry.
    ///
    /// Classes already in the registry are reopened so new relations can
    /// extend them; they are written back only if something changed. When
    /// every class is cached the pass stops before relation resolution.
    pub fn compile(&self, catalog: &EntityCatalog, registry: &SchemaRegistry) -> Result<CompileReport, DataError> {
        let mut declarations = Vec::with_capacity(catalog.classes().len());
        for class in catalog.classes() {
            let declaration = catalog.reflect(class)?;
            entity_attribute(&declaration)?;
            declarations.push(declaration);
        }

        let mut report = CompileReport::default();
        let mut ctx = CompilationContext::new(catalog, registry, self.naming.as_ref(), &self.config);
        for declaration in &declarations {
            match registry.get_class_metadata(&declaration.class) {
                Some(metadata) => {
                    tracing::debug!(class = %declaration.class, "Class metadata cache hit");
                    ctx.insert_builder(EntityBuilder::from_definition(metadata.entity()));
                    report.cached.push(declaration.class.clone());
                }
                None => {
                    let builder = build_entity(declaration, &self.types, self.naming.as_ref(), &self.config)?;
                    ctx.insert_builder(builder);
                    report.built.push(declaration.class.clone());
                }
            }
        }
        if report.is_warm() {
            return Ok(report);
        }

        self.relations.process(&mut ctx)?;

        let (builders, connections) = ctx.into_parts();
        for builder in builders.into_iter().filter(EntityBuilder::is_dirty) {
            let declaration = catalog.declaration(builder.class()).map(|d| (*d).clone());
            let definition = builder.build()?;
            let class = definition.class.clone();
            registry.set_class_metadata(ClassMetadata::new(definition, declaration))?;
            report.saved.push(class);
        }
        report.connections = connections.len();
        for connection in connections {
            registry.set_entities_connection(connection)?;
        }

        tracing::debug!(
            built = report.built.len(),
            cached = report.cached.len(),
            saved = report.saved.len(),
            connections = report.connections,
            "Compiled class metadata"
        );
        Ok(report)
    }
}

/// Serves class metadata, compiling the catalog on first access.
///
/// Compilation runs once per factory; concurrent first accesses wait for it.
pub struct ClassMetadataFactory {
    catalog: EntityCatalog,
    registry: Arc<SchemaRegistry>,
    compiler: MetadataCompiler,
    compiled: Mutex<Option<CompileReport>>,
}

impl ClassMetadataFactory {
    pub fn new(catalog: EntityCatalog, registry: Arc<SchemaRegistry>, compiler: MetadataCompiler) -> Self {
        Self {
            catalog,
            registry,
            compiler,
            compiled: Mutex::new(None),
        }
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Compile if no pass has succeeded yet, and return that pass's report.
    pub fn compile(&self) -> Result<CompileReport, DataError> {
        let mut compiled = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(report) = compiled.as_ref() {
            return Ok(report.clone());
        }
        let report = self.compiler.compile(&self.catalog, &self.registry)?;
        *compiled = Some(report.clone());
        Ok(report)
    }

    pub fn get_class_metadata(&self, class: &str) -> Result<Option<Arc<ClassMetadata>>, DataError> {
        self.compile()?;
        Ok(self.registry.get_class_metadata(class))
    }

    pub fn get_all_class_metadata(&self) -> Result<Vec<Arc<ClassMetadata>>, DataError> {
        self.compile()?;
        Ok(self.registry.get_all_class_metadata())
    }
}

impl std::fmt::Debug for ClassMetadataFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassMetadataFactory")
            .field("classes", &self.catalog.classes())
            .field("registry", &self.registry)
            .finish()
    }
}
