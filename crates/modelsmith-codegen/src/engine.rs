use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use modelsmith_core::DatabaseSchema;

use crate::annotate::annotate;
use crate::classify::{AssociationRule, TwoForeignKeyRule};
use crate::errors::{CodegenError, GenerationIssue};
use crate::inflect::Inflector;
use crate::inheritance::detect_inheritance;
use crate::model::ObjectModel;
use crate::options::GeneratorOptions;
use crate::overrides::RelationshipOverrides;
use crate::relationships::infer_relationships;
use crate::render::Renderer;
use crate::typemap::TypeMap;

/// Result of a generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedModule {
    /// Complete Python module text.
    pub source: String,
    /// Recoverable issues, in the order they were found.
    pub warnings: Vec<GenerationIssue>,
}

/// Entry point for turning a schema snapshot into declarative model source.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    options: GeneratorOptions,
    overrides: RelationshipOverrides,
    types: TypeMap,
    rule: Arc<dyn AssociationRule>,
}

impl CodeGenerator {
    /// Validate the options up front; conflicting forced relationships are
    /// rejected here, before any snapshot is read.
    pub fn new(options: GeneratorOptions) -> Result<Self, CodegenError> {
        let overrides = RelationshipOverrides::from_entries(options.relationships.iter().cloned())?;
        let types = TypeMap::new(options.types.clone());
        Ok(Self {
            options,
            overrides,
            types,
            rule: Arc::new(TwoForeignKeyRule),
        })
    }

    /// Replace the association table heuristic.
    pub fn with_association_rule(mut self, rule: impl AssociationRule + 'static) -> Self {
        self.rule = Arc::new(rule);
        self
    }

    /// Run the whole pipeline. The snapshot is only read; the same snapshot
    /// and options always produce the same module.
    pub fn generate(&self, schema: &DatabaseSchema) -> Result<GeneratedModule, CodegenError> {
        let start = Instant::now();
        let options = &self.options;
        info!(
            engine = %schema.engine,
            schemas = schema.schemas.len(),
            forced_relationships = self.overrides.len(),
            "code generation started"
        );

        let outcome = self.run(schema);
        match &outcome {
            Ok(module) => info!(
                warnings = module.warnings.len(),
                bytes = module.source.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                classes = options.generate_classes,
                "code generation completed"
            ),
            Err(err) => warn!(error = %err, "code generation failed"),
        }
        outcome
    }

    fn run(&self, schema: &DatabaseSchema) -> Result<GeneratedModule, CodegenError> {
        let options = &self.options;
        let inflector = Inflector::new(options.inflect);
        let mut warnings = Vec::new();

        let mut model = ObjectModel::build(schema, options, self.rule.as_ref(), &inflector)?;
        info!(
            schema = %model.namespace.name,
            tables = model.tables.len(),
            classes = model.entities.len(),
            association_tables = model.association_tables.len(),
            "object model built"
        );

        if options.generate_classes {
            if options.detect_inheritance {
                detect_inheritance(&mut model, &mut warnings);
            }
            infer_relationships(&mut model, &inflector, &options.backrefs);
            if !self.overrides.is_empty() {
                self.overrides.apply(&mut model, &options.backrefs, &mut warnings);
            }
            annotate(&mut model, options, &mut warnings);
        }

        let source = Renderer::new(&model, options, &self.types).render(&mut warnings)?;
        Ok(GeneratedModule { source, warnings })
    }
}
