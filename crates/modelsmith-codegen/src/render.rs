//! SQLAlchemy declarative source emission.
//!
//! Rendering reads the finished [`ObjectModel`] and never changes it. Blocks
//! are produced in [`ObjectModel::render_order`]; imports are collected while
//! rendering and emitted first.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use modelsmith_core::{Column, ForeignKey, Table};

use crate::errors::{CodegenError, GenerationIssue, report};
use crate::model::{
    Cardinality, Entity, FkEdge, ObjectModel, RESERVED_ATTRIBUTES, Relationship, RelationshipOrigin,
    column_attribute,
};
use crate::options::GeneratorOptions;
use crate::typemap::TypeMap;

const INDENT: &str = "    ";

/// Python imports grouped by module.
#[derive(Debug, Clone, Default)]
pub struct Imports {
    modules: BTreeMap<String, BTreeSet<String>>,
}

impl Imports {
    pub fn add(&mut self, module: &str, name: &str) {
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(name.to_string());
    }

    pub fn contains(&self, module: &str, name: &str) -> bool {
        self.modules
            .get(module)
            .is_some_and(|names| names.contains(name))
    }

    fn render(&self) -> String {
        self.modules
            .iter()
            .map(|(module, names)| {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                format!("from {module} import {}\n", names.join(", "))
            })
            .collect()
    }
}

/// Python string literal, quoted the way `repr()` would.
pub fn py_repr(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Relationship option value. Top-level strings are inserted verbatim so
/// callers can pass arbitrary expressions.
fn option_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => python_literal(other),
    }
}

fn python_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => py_repr(text),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(python_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let items: Vec<String> = map
                .iter()
                .map(|(key, value)| format!("{}: {}", py_repr(key), python_literal(value)))
                .collect();
            format!("{{{}}}", items.join(", "))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Class,
    Table,
}

/// Renders a finished object model into module source.
pub struct Renderer<'m, 'a> {
    model: &'m ObjectModel<'a>,
    options: &'m GeneratorOptions,
    types: &'m TypeMap,
    imports: Imports,
    issues: Vec<GenerationIssue>,
}

impl<'m, 'a> Renderer<'m, 'a> {
    pub fn new(model: &'m ObjectModel<'a>, options: &'m GeneratorOptions, types: &'m TypeMap) -> Self {
        Self {
            model,
            options,
            types,
            imports: Imports::default(),
            issues: Vec::new(),
        }
    }

    /// Render the whole module. Issues found while rendering are appended to
    /// `issues`; a naming collision aborts without output.
    pub fn render(mut self, issues: &mut Vec<GenerationIssue>) -> Result<String, CodegenError> {
        let model = self.model;
        let mut blocks = Vec::new();
        for table in model.render_order() {
            let block = match model.entity(&table.name) {
                Some(entity) => self.render_class(table, entity)?,
                None => self.render_table(table),
            };
            blocks.push(block);
        }

        let audited = model.entities.values().any(|entity| entity.audited);
        let mut preamble = Vec::new();
        if model.entities.is_empty() {
            self.imports.add("sqlalchemy", "MetaData");
            preamble.push("metadata = MetaData()".to_string());
        } else {
            self.imports.add("sqlalchemy.orm", "declarative_base");
            preamble.push("Base = declarative_base()".to_string());
            preamble.push("metadata = Base.metadata".to_string());
        }
        if audited {
            self.imports.add("sqlalchemy_continuum", "make_versioned");
            self.imports.add("sqlalchemy.orm", "configure_mappers");
            preamble.push("make_versioned(user_cls=None)".to_string());
        }

        let mut out = String::from("# coding: utf-8\n");
        out.push_str(&self.imports.render());
        out.push('\n');
        for line in &preamble {
            out.push_str(line);
            out.push('\n');
        }
        for block in &blocks {
            out.push_str("\n\n");
            out.push_str(block);
        }
        if audited {
            out.push_str("\n\nconfigure_mappers()\n");
        }

        for issue in self.issues {
            report(issues, issue);
        }
        Ok(out)
    }

    fn render_class(&mut self, table: &'a Table, entity: &Entity) -> Result<String, CodegenError> {
        let mut bases = vec![match entity.parent.as_deref().and_then(|parent| self.model.entity(parent)) {
            Some(parent) => parent.class_name.clone(),
            None => "Base".to_string(),
        }];
        for capability in &entity.capabilities {
            let spec = capability.spec();
            self.imports.add(spec.module, spec.mixin);
            bases.push(spec.mixin.to_string());
        }

        let mut columns = self.model.mapped_columns(table);
        columns.sort_by_key(|column| !table.is_primary_key_column(&column.name));
        let mut taken: BTreeSet<String> =
            RESERVED_ATTRIBUTES.iter().map(|name| name.to_string()).collect();
        let check = |taken: &mut BTreeSet<String>, name: &str| {
            if taken.insert(name.to_string()) {
                Ok(())
            } else {
                Err(CodegenError::NamingCollision {
                    entity: entity.class_name.clone(),
                    name: name.to_string(),
                })
            }
        };
        for column in &columns {
            check(&mut taken, &column_attribute(&column.name))?;
        }
        let mut relationships: Vec<&Relationship> = entity.relationships.iter().collect();
        relationships.sort_by(|a, b| a.name.cmp(&b.name));
        for rel in &relationships {
            check(&mut taken, &rel.name)?;
        }

        let mut out = format!("class {}({}):\n", entity.class_name, bases.join(", "));
        out.push_str(&format!("{INDENT}__tablename__ = {}\n", py_repr(&table.name)));

        let mut table_args = self.table_items(table, &columns);
        let mut kwargs = Vec::new();
        if self.model.qualified {
            kwargs.push(format!("'schema': {}", py_repr(&self.model.namespace.name)));
        }
        if let Some(comment) = &table.comment {
            kwargs.push(format!("'comment': {}", py_repr(comment)));
        }
        let kwargs = (!kwargs.is_empty()).then(|| format!("{{{}}}", kwargs.join(", ")));
        match (table_args.is_empty(), kwargs) {
            (true, None) => {}
            (true, Some(kwargs)) => out.push_str(&format!("{INDENT}__table_args__ = {kwargs}\n")),
            (false, kwargs) => {
                table_args.extend(kwargs);
                out.push_str(&format!("{INDENT}__table_args__ = (\n"));
                for item in &table_args {
                    out.push_str(&format!("{INDENT}{INDENT}{item},\n"));
                }
                out.push_str(&format!("{INDENT})\n"));
            }
        }
        if entity.audited {
            out.push_str(&format!("{INDENT}__versioned__ = {{}}\n"));
        }

        if !columns.is_empty() {
            out.push('\n');
        }
        for column in &columns {
            let rendered = self.render_column(table, column, Mode::Class);
            out.push_str(&format!("{INDENT}{} = {rendered}\n", column_attribute(&column.name)));
        }

        if !relationships.is_empty() {
            out.push('\n');
        }
        for rel in relationships {
            let rendered = self.render_relationship(entity, rel);
            out.push_str(&format!("{INDENT}{} = {rendered}\n", rel.name));
        }

        Ok(out)
    }

    fn render_table(&mut self, table: &'a Table) -> String {
        self.imports.add("sqlalchemy", "Table");
        let columns: Vec<&Column> = table.columns.iter().collect();

        let mut items = vec![format!("{}, metadata", py_repr(&table.name))];
        for column in &columns {
            items.push(self.render_column(table, column, Mode::Table));
        }
        items.extend(self.table_items(table, &columns));
        if self.model.qualified {
            items.push(format!("schema={}", py_repr(&self.model.namespace.name)));
        }
        if let Some(comment) = &table.comment {
            items.push(format!("comment={}", py_repr(comment)));
        }

        let body: Vec<String> = items.iter().map(|item| format!("{INDENT}{item}")).collect();
        format!(
            "t_{} = Table(\n{}\n)\n",
            crate::inflect::sanitize_identifier(&table.name),
            body.join(",\n")
        )
    }

    fn render_column(&mut self, table: &Table, column: &Column, mode: Mode) -> String {
        self.imports.add("sqlalchemy", "Column");
        let mut args = Vec::new();

        if mode == Mode::Table || column_attribute(&column.name) != column.name {
            args.push(py_repr(&column.name));
        }

        let foreign_key = table
            .foreign_keys()
            .find(|fk| fk.columns.len() == 1 && fk.columns[0] == column.name);
        match foreign_key {
            Some(fk) => {
                self.imports.add("sqlalchemy", "ForeignKey");
                let mut fk_args = vec![py_repr(&self.fk_target(fk, &fk.referenced_columns[0]))];
                fk_args.extend(fk_actions(fk));
                args.push(format!("ForeignKey({})", fk_args.join(", ")));
            }
            None => args.push(self.render_type(table, column)),
        }

        if let Some(expression) = column
            .generated
            .as_ref()
            .and_then(|generated| generated.expression.as_deref())
        {
            self.imports.add("sqlalchemy", "Computed");
            args.push(format!("Computed({}, persisted=True)", py_repr(expression)));
        }

        let primary_key = table.is_primary_key_column(&column.name);
        if primary_key {
            args.push("primary_key=True".to_string());
        }
        if !column.is_nullable && (mode == Mode::Table || !primary_key) {
            args.push("nullable=False".to_string());
        }

        let single = [column.name.clone()];
        let unique_constraint = self.options.include_constraints
            && table.unique_constraints().any(|unique| unique.columns == single);
        let single_indexes: Vec<_> = table
            .indexes
            .iter()
            .filter(|index| {
                self.options.include_indexes
                    && index.is_valid
                    && !index.is_primary
                    && index.columns == single
            })
            .collect();
        if unique_constraint || single_indexes.iter().any(|index| index.is_unique) {
            args.push("unique=True".to_string());
        }
        if single_indexes.iter().any(|index| !index.is_unique) {
            args.push("index=True".to_string());
        }

        let implied_default = primary_key && column.is_autoincrement();
        if let Some(default) = column.default.as_deref() {
            if !implied_default && column.generated.is_none() {
                self.imports.add("sqlalchemy", "text");
                args.push(format!("server_default=text({})", py_repr(default)));
            }
        }
        if let Some(comment) = &column.comment {
            args.push(format!("comment={}", py_repr(comment)));
        }

        format!("Column({})", args.join(", "))
    }

    fn render_type(&mut self, table: &Table, column: &Column) -> String {
        match self
            .types
            .render(&column.column_type, self.model.schema, &mut self.imports)
        {
            Some(rendered) => rendered,
            None => {
                self.issues.push(GenerationIssue::new(
                    "unknown_column_type",
                    format!(
                        "column {}.{} has unmapped type {}",
                        table.name, column.name, column.column_type.data_type
                    ),
                    Some(&table.name),
                ));
                self.imports.add("sqlalchemy.sql.sqltypes", "NullType");
                "NullType".to_string()
            }
        }
    }

    /// Constraints and indexes that are not expressed on a single column.
    fn table_items(&mut self, table: &Table, columns: &[&Column]) -> Vec<String> {
        let mapped = |names: &[String]| {
            names
                .iter()
                .all(|name| columns.iter().any(|column| column.name == *name))
        };
        let mut items = Vec::new();

        for fk in table.foreign_keys() {
            if fk.columns.len() < 2 || !mapped(&fk.columns) {
                continue;
            }
            self.imports.add("sqlalchemy", "ForeignKeyConstraint");
            let local: Vec<String> = fk.columns.iter().map(|column| py_repr(column)).collect();
            let remote: Vec<String> = fk
                .referenced_columns
                .iter()
                .map(|column| py_repr(&self.fk_target(fk, column)))
                .collect();
            let mut args = vec![format!("[{}]", local.join(", ")), format!("[{}]", remote.join(", "))];
            args.extend(fk_actions(fk));
            items.push(format!("ForeignKeyConstraint({})", args.join(", ")));
        }

        if self.options.include_constraints {
            for check in table.check_constraints() {
                self.imports.add("sqlalchemy", "CheckConstraint");
                let mut args = vec![py_repr(&check.expression)];
                if let Some(name) = &check.name {
                    args.push(format!("name={}", py_repr(name)));
                }
                items.push(format!("CheckConstraint({})", args.join(", ")));
            }
            for unique in table.unique_constraints() {
                if unique.columns.len() < 2 || !mapped(&unique.columns) {
                    continue;
                }
                self.imports.add("sqlalchemy", "UniqueConstraint");
                let names: Vec<String> = unique.columns.iter().map(|column| py_repr(column)).collect();
                items.push(format!("UniqueConstraint({})", names.join(", ")));
            }
        }

        if self.options.include_indexes {
            let pk = table.primary_key_columns();
            for index in &table.indexes {
                let duplicates_constraint = index.columns == pk
                    || (self.options.include_constraints
                        && table
                            .unique_constraints()
                            .any(|unique| unique.columns == index.columns));
                if !index.is_valid
                    || index.is_primary
                    || index.columns.len() < 2
                    || duplicates_constraint
                    || !mapped(&index.columns)
                {
                    continue;
                }
                self.imports.add("sqlalchemy", "Index");
                let mut args = vec![py_repr(&index.name)];
                args.extend(index.columns.iter().map(|column| py_repr(column)));
                if index.is_unique {
                    args.push("unique=True".to_string());
                }
                items.push(format!("Index({})", args.join(", ")));
            }
        }

        items
    }

    fn render_relationship(&mut self, entity: &Entity, rel: &Relationship) -> String {
        self.imports.add("sqlalchemy.orm", "relationship");
        let mut args = vec![py_repr(&self.class_name(&rel.target))];

        if rel.origin == RelationshipOrigin::Forced {
            for (key, value) in &rel.options {
                args.push(format!("{key}={}", option_value(value)));
            }
            return format!("relationship({})", args.join(", "));
        }

        if let Some(association) = &rel.association {
            args.push(format!("secondary={}", py_repr(&self.qualified_table(&association.table))));
            if rel.explicit_join {
                let primary = join_condition(&entity.class_name, &association.table, &association.source_edge);
                let secondary = join_condition(
                    &self.class_name(&rel.target),
                    &association.table,
                    &association.target_edge,
                );
                args.push(format!("primaryjoin={}", py_repr(&primary)));
                args.push(format!("secondaryjoin={}", py_repr(&secondary)));
            }
        }

        if let Some(edge) = &rel.edge {
            let referencing_class = self.class_name(&edge.table);
            if rel.explicit_join {
                let columns = attribute_list(&referencing_class, &edge.columns);
                args.push(format!("foreign_keys={}", py_repr(&columns)));
            }
            if rel.cardinality.is_forward() && edge.is_self_referential() {
                let remote = attribute_list(&entity.class_name, &edge.referenced_columns);
                args.push(format!("remote_side={}", py_repr(&remote)));
            }
            if rel.cardinality == Cardinality::OneToOne {
                args.push("uselist=False".to_string());
            }
        }

        if let Some(back) = &rel.back_populates {
            args.push(format!("back_populates={}", py_repr(back)));
        }
        format!("relationship({})", args.join(", "))
    }

    fn class_name(&self, table: &str) -> String {
        self.model
            .entity(table)
            .map(|entity| entity.class_name.clone())
            .unwrap_or_else(|| table.to_string())
    }

    fn qualified_table(&self, table: &str) -> String {
        if self.model.qualified {
            format!("{}.{table}", self.model.namespace.name)
        } else {
            table.to_string()
        }
    }

    fn fk_target(&self, fk: &ForeignKey, column: &str) -> String {
        if self.model.qualified || fk.referenced_schema != self.model.namespace.name {
            format!("{}.{}.{column}", fk.referenced_schema, fk.referenced_table)
        } else {
            format!("{}.{column}", fk.referenced_table)
        }
    }
}

fn fk_actions(fk: &ForeignKey) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(action) = fk.on_delete.as_sql() {
        args.push(format!("ondelete={}", py_repr(action)));
    }
    if let Some(action) = fk.on_update.as_sql() {
        args.push(format!("onupdate={}", py_repr(action)));
    }
    args
}

/// `[Book.author_id]`, the string form resolved lazily by the mapper.
fn attribute_list(class_name: &str, columns: &[String]) -> String {
    let attributes: Vec<String> = columns
        .iter()
        .map(|column| format!("{class_name}.{}", column_attribute(column)))
        .collect();
    format!("[{}]", attributes.join(", "))
}

fn join_condition(class_name: &str, association: &str, edge: &FkEdge) -> String {
    let conditions: Vec<String> = edge
        .columns
        .iter()
        .zip(&edge.referenced_columns)
        .map(|(local, referenced)| {
            format!(
                "{class_name}.{} == {association}.c.{local}",
                column_attribute(referenced)
            )
        })
        .collect();
    if conditions.len() == 1 {
        conditions.join("")
    } else {
        format!("and_({})", conditions.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn python_repr_picks_quotes() {
        assert_eq!(py_repr("book"), "'book'");
        assert_eq!(py_repr("nextval('book_id_seq'::regclass)"), "\"nextval('book_id_seq'::regclass)\"");
        assert_eq!(py_repr("it's \"quoted\""), "'it\\'s \"quoted\"'");
        assert_eq!(py_repr("a\\b\n"), "'a\\\\b\\n'");
    }

    #[test]
    fn option_values_render_as_python() {
        assert_eq!(option_value(&json!("'dynamic'")), "'dynamic'");
        assert_eq!(option_value(&json!(true)), "True");
        assert_eq!(option_value(&json!(null)), "None");
        assert_eq!(option_value(&json!(3)), "3");
        assert_eq!(option_value(&json!(["a", false])), "['a', False]");
        assert_eq!(option_value(&json!({"k": "v"})), "{'k': 'v'}");
    }

    #[test]
    fn imports_are_grouped_and_sorted() {
        let mut imports = Imports::default();
        imports.add("sqlalchemy.orm", "relationship");
        imports.add("sqlalchemy", "Integer");
        imports.add("sqlalchemy", "Column");
        imports.add("sqlalchemy", "Column");
        assert_eq!(
            imports.render(),
            "from sqlalchemy import Column, Integer\nfrom sqlalchemy.orm import relationship\n"
        );
    }

    #[test]
    fn composite_join_conditions_use_and() {
        let edge = FkEdge {
            table: "link".to_string(),
            columns: vec!["a_id".to_string(), "a_rev".to_string()],
            referenced_table: "doc".to_string(),
            referenced_columns: vec!["id".to_string(), "rev".to_string()],
        };
        assert_eq!(
            join_condition("Doc", "link", &edge),
            "and_(Doc.id == link.c.a_id, Doc.rev == link.c.a_rev)"
        );
    }

    #[test]
    fn primary_key_columns_lead_class_blocks() {
        use crate::engine::CodeGenerator;
        use crate::options::GeneratorOptions;
        use crate::testing::{pk, snapshot, table};

        let schema = snapshot(vec![table("widget", &["label", "id"], vec![pk(&["id"])])]);
        let source = CodeGenerator::new(GeneratorOptions::default())
            .expect("options")
            .generate(&schema)
            .expect("generate")
            .source;

        let id = source.find("    id = Column(").expect("id");
        let label = source.find("    label = Column(").expect("label");
        assert!(id < label);
    }
}
