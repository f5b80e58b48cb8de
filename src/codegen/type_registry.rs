//! Closed mapping from abstract field types to target representations.
//!
//! Every `(FieldType, MappingTarget)` pair has exactly one descriptor. The
//! validator rejects unknown type names before generation starts, so a
//! missing entry here is an internal inconsistency, reported as a
//! [`TypeRegistryGap`].

use std::collections::HashMap;

use serde::Serialize;

use crate::config::FieldType;
use crate::error::TypeRegistryGap;

/// Representation a field type is mapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingTarget {
    /// SQLAlchemy column type
    Column,
    /// Pydantic / Python annotation
    Schema,
    /// UI input widget
    Widget,
    /// TypeScript property type
    TypeScript,
}

impl MappingTarget {
    pub const ALL: [MappingTarget; 4] = [
        MappingTarget::Column,
        MappingTarget::Schema,
        MappingTarget::Widget,
        MappingTarget::TypeScript,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MappingTarget::Column => "column",
            MappingTarget::Schema => "schema",
            MappingTarget::Widget => "widget",
            MappingTarget::TypeScript => "typescript",
        }
    }
}

/// Target-side type: name, constructor arguments and the import it needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TargetTypeDescriptor {
    pub name: &'static str,
    /// Constructor arguments, e.g. `timezone=True` for `DateTime`
    pub args: Option<&'static str>,
    /// Length used for `String(n)` when the field sets no `max_length`
    pub default_length: Option<u32>,
    /// Module to import `name` from, e.g. `datetime`
    pub import: Option<&'static str>,
}

impl TargetTypeDescriptor {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            args: None,
            default_length: None,
            import: None,
        }
    }

    pub const fn with_args(mut self, args: &'static str) -> Self {
        self.args = Some(args);
        self
    }

    pub const fn with_length(mut self, length: u32) -> Self {
        self.default_length = Some(length);
        self
    }

    pub const fn imported_from(mut self, module: &'static str) -> Self {
        self.import = Some(module);
        self
    }

    /// Render the type expression, e.g. `String(200)` or `DateTime(timezone=True)`.
    ///
    /// `length` overrides the default length of sized types.
    pub fn expression(&self, length: Option<u32>) -> String {
        match (length.or(self.default_length), self.args) {
            (Some(len), _) => format!("{}({})", self.name, len),
            (None, Some(args)) => format!("{}({})", self.name, args),
            (None, None) => self.name.to_string(),
        }
    }
}

const fn t(name: &'static str) -> TargetTypeDescriptor {
    TargetTypeDescriptor::new(name)
}

/// Default mapping table, one row per abstract field type
fn builtin_rows() -> Vec<(FieldType, [TargetTypeDescriptor; 4])> {
    use FieldType::*;
    vec![
        (String, [t("String").with_length(255), t("str"), t("text"), t("string")]),
        (Text, [t("Text"), t("str"), t("textarea"), t("string")]),
        (Integer, [t("Integer"), t("int"), t("number"), t("number")]),
        (Float, [t("Float"), t("float"), t("number"), t("number")]),
        (
            Decimal,
            [
                t("Numeric").with_args("12, 2"),
                t("Decimal").imported_from("decimal"),
                t("number"),
                t("number"),
            ],
        ),
        (Boolean, [t("Boolean"), t("bool"), t("checkbox"), t("boolean")]),
        (Date, [t("Date"), t("date").imported_from("datetime"), t("date"), t("string")]),
        (
            Datetime,
            [
                t("DateTime").with_args("timezone=True"),
                t("datetime").imported_from("datetime"),
                t("datetime-local"),
                t("string"),
            ],
        ),
        (Time, [t("Time"), t("time").imported_from("datetime"), t("time"), t("string")]),
        (Enum, [t("String").with_length(50), t("str"), t("select"), t("string")]),
        (File, [t("String").with_length(512), t("str"), t("file"), t("string")]),
        (Uuid, [t("Uuid"), t("UUID").imported_from("uuid"), t("text"), t("string")]),
        (
            Json,
            [
                t("JSON"),
                t("dict[str, Any]").imported_from("typing"),
                t("json"),
                t("Record<string, unknown>"),
            ],
        ),
        (Array, [t("JSON"), t("list[Any]").imported_from("typing"), t("tags"), t("unknown[]")]),
        (
            Email,
            [
                t("String").with_length(255),
                t("EmailStr").imported_from("pydantic"),
                t("email"),
                t("string"),
            ],
        ),
        (
            Url,
            [
                t("String").with_length(2048),
                t("HttpUrl").imported_from("pydantic"),
                t("url"),
                t("string"),
            ],
        ),
    ]
}

/// Registry of target type descriptors
#[derive(Debug, Clone)]
pub struct TypeMappingRegistry {
    table: HashMap<(FieldType, MappingTarget), TargetTypeDescriptor>,
}

impl Default for TypeMappingRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TypeMappingRegistry {
    /// Registry populated with the built-in FastAPI/React mappings
    pub fn builtin() -> Self {
        let mut table = HashMap::new();
        for (field_type, descriptors) in builtin_rows() {
            for (target, descriptor) in MappingTarget::ALL.into_iter().zip(descriptors) {
                table.insert((field_type, target), descriptor);
            }
        }
        Self { table }
    }

    /// Look up the descriptor for `field_type` in `target`
    pub fn map_type(
        &self,
        field_type: FieldType,
        target: MappingTarget,
    ) -> Result<&TargetTypeDescriptor, TypeRegistryGap> {
        self.table.get(&(field_type, target)).ok_or(TypeRegistryGap {
            field_type,
            target,
            entity: None,
            field: None,
        })
    }

    /// Replace or add a single mapping
    pub fn register(&mut self, field_type: FieldType, target: MappingTarget, descriptor: TargetTypeDescriptor) {
        self.table.insert((field_type, target), descriptor);
    }

    /// Remove a mapping, returning the descriptor it held
    pub fn unregister(&mut self, field_type: FieldType, target: MappingTarget) -> Option<TargetTypeDescriptor> {
        self.table.remove(&(field_type, target))
    }

    /// Check that every field type has a descriptor for every target.
    ///
    /// Run once before generation; reports the first gap in declaration order.
    pub fn verify(&self) -> Result<(), TypeRegistryGap> {
        for field_type in FieldType::ALL {
            for target in MappingTarget::ALL {
                self.map_type(field_type, target)?;
            }
        }
        Ok(())
    }

    /// Python imports needed for the schema types of `field_types`, as
    /// `(module, name)` pairs in sorted order.
    pub fn schema_imports<I>(&self, field_types: I) -> Result<Vec<(&'static str, &'static str)>, TypeRegistryGap>
    where
        I: IntoIterator<Item = FieldType>,
    {
        let mut imports = Vec::new();
        for field_type in field_types {
            let descriptor = self.map_type(field_type, MappingTarget::Schema)?;
            if let Some(module) = descriptor.import {
                let name = match module {
                    "typing" => "Any",
                    _ => descriptor.name,
                };
                imports.push((module, name));
            }
        }
        imports.sort_unstable();
        imports.dedup();
        Ok(imports)
    }
}
