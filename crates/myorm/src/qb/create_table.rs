//! CREATE TABLE builder.
//!
//! DDL cannot bind parameters, so defaults and `ENUM` members are rendered
//! as escaped literals via [`Value::to_sql_literal`].

use crate::error::{OrmError, OrmResult};
use crate::ident::escape_id;
use crate::qb::traits::{BuiltQuery, MutationQb, SqlQb};
use crate::value::Value;
use std::str::FromStr;

/// Logical column type of a model property.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// `VARCHAR(size)`, or `LONGTEXT` when `big`.
    Text { size: Option<u32>, big: bool },
    /// `FLOAT`, or `INTEGER` when not `rational`.
    Number { rational: bool },
    Integer,
    Boolean,
    /// `DATE`, or `DATETIME` when `time`.
    Date { time: bool },
    /// `BLOB`, or `LONGBLOB` when `big`.
    Binary { big: bool },
    /// JSON text stored as `LONGTEXT`.
    Object,
    Enum(Vec<Value>),
    /// Auto-increment primary key.
    Serial,
}

impl FieldType {
    pub fn text() -> Self {
        FieldType::Text {
            size: None,
            big: false,
        }
    }

    pub fn enumeration<T: Into<Value>>(values: impl IntoIterator<Item = T>) -> Self {
        FieldType::Enum(values.into_iter().map(Into::into).collect())
    }

    /// Column type in MySQL DDL.
    pub fn sql_type(&self) -> OrmResult<String> {
        Ok(match self {
            FieldType::Text { big: true, .. } => "LONGTEXT".to_string(),
            FieldType::Text { size, .. } => format!("VARCHAR({})", size.unwrap_or(255)),
            FieldType::Number { rational: true } => "FLOAT".to_string(),
            FieldType::Number { rational: false } | FieldType::Integer => "INTEGER".to_string(),
            FieldType::Boolean => "BOOLEAN".to_string(),
            FieldType::Date { time: true } => "DATETIME".to_string(),
            FieldType::Date { time: false } => "DATE".to_string(),
            FieldType::Binary { big: true } => "LONGBLOB".to_string(),
            FieldType::Binary { big: false } => "BLOB".to_string(),
            FieldType::Object => "LONGTEXT".to_string(),
            FieldType::Enum(values) if values.is_empty() => {
                return Err(OrmError::validation("enum field needs at least one value"));
            }
            FieldType::Enum(values) => {
                let members: Vec<String> = values.iter().map(Value::to_sql_literal).collect();
                format!("ENUM({})", members.join(", "))
            }
            FieldType::Serial => "INT UNSIGNED NOT NULL AUTO_INCREMENT".to_string(),
        })
    }
}

impl FromStr for FieldType {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(FieldType::text()),
            "number" => Ok(FieldType::Number { rational: true }),
            "integer" => Ok(FieldType::Integer),
            "boolean" => Ok(FieldType::Boolean),
            "date" => Ok(FieldType::Date { time: true }),
            "binary" => Ok(FieldType::Binary { big: false }),
            "object" => Ok(FieldType::Object),
            "enum" => Ok(FieldType::Enum(Vec::new())),
            "serial" => Ok(FieldType::Serial),
            _ => Err(OrmError::validation(format!("unknown field type '{s}'"))),
        }
    }
}

/// One column of a create-table request.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub field_type: FieldType,
    pub required: bool,
    pub default: Option<Value>,
}

impl FieldDefinition {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    fn column_sql(&self, name: &str) -> OrmResult<String> {
        let mut sql = format!("{} {}", escape_id(name), self.field_type.sql_type()?);
        if self.field_type == FieldType::Serial {
            return Ok(sql);
        }
        if self.required {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql_literal());
        }
        Ok(sql)
    }
}

impl From<FieldType> for FieldDefinition {
    fn from(field_type: FieldType) -> Self {
        Self::new(field_type)
    }
}

/// CREATE TABLE IF NOT EXISTS builder.
///
/// A table without columns, or an `ENUM` without members, cannot be
/// rendered. For such definitions [`SqlQb::build`] and [`SqlQb::to_sql`]
/// produce an empty statement; use [`CreateTableQb::sql`] or
/// [`SqlQb::try_build`] to get the validation error instead.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableQb {
    table: String,
    fields: Vec<(String, FieldDefinition)>,
}

impl CreateTableQb {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            fields: Vec::new(),
        }
    }

    /// Add a column; columns keep insertion order.
    pub fn add_field(mut self, name: &str, def: impl Into<FieldDefinition>) -> Self {
        self.fields.push((name.to_string(), def.into()));
        self
    }

    /// Validate and render the statement.
    pub fn sql(&self) -> OrmResult<String> {
        Ok(self.try_build()?.sql)
    }

    fn render(&self) -> OrmResult<String> {
        let mut columns = Vec::with_capacity(self.fields.len() + 1);
        let mut keys = Vec::new();
        for (name, def) in &self.fields {
            columns.push(def.column_sql(name)?);
            if def.field_type == FieldType::Serial {
                keys.push(escape_id(name));
            }
        }
        if !keys.is_empty() {
            columns.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        }
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            escape_id(&self.table),
            columns.join(", ")
        ))
    }
}

impl SqlQb for CreateTableQb {
    /// Renders invalid definitions as an empty statement; use
    /// [`SqlQb::try_build`] to get the validation error.
    fn build(&self) -> BuiltQuery {
        BuiltQuery::text(self.render().unwrap_or_default())
    }

    fn validate(&self) -> OrmResult<()> {
        if self.fields.is_empty() {
            return Err(OrmError::validation(format!(
                "CREATE TABLE {} has no columns",
                self.table
            )));
        }
        self.render().map(|_| ())
    }
}

impl MutationQb for CreateTableQb {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_becomes_primary_key() {
        let sql = CreateTableQb::new("pets")
            .add_field("id", FieldType::Serial)
            .add_field("name", FieldDefinition::new(FieldType::text()).required())
            .add_field("alive", FieldDefinition::new(FieldType::Boolean).with_default(true))
            .try_build()
            .unwrap()
            .sql;
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS `pets` (`id` INT UNSIGNED NOT NULL AUTO_INCREMENT, \
             `name` VARCHAR(255) NOT NULL, `alive` BOOLEAN DEFAULT TRUE, PRIMARY KEY (`id`))"
        );
    }

    #[test]
    fn enum_members_are_quoted_literals() {
        let sql = CreateTableQb::new("t")
            .add_field("mood", FieldType::enumeration(["happy", "it's fine"]))
            .to_sql();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS `t` (`mood` ENUM('happy', 'it\\'s fine'))"
        );
    }

    #[test]
    fn invalid_definitions_are_rejected() {
        assert!(CreateTableQb::new("t").try_build().is_err());
        let empty_enum = CreateTableQb::new("t").add_field("e", FieldType::Enum(vec![]));
        assert!(matches!(empty_enum.try_build(), Err(OrmError::Validation(_))));
    }

    #[test]
    fn unchecked_render_of_invalid_table_is_empty() {
        let empty_enum = CreateTableQb::new("t").add_field("e", FieldType::Enum(vec![]));
        assert_eq!(empty_enum.to_sql(), "");
        assert!(matches!(empty_enum.sql(), Err(OrmError::Validation(_))));

        let ok = CreateTableQb::new("t").add_field("n", FieldType::Integer);
        assert_eq!(ok.sql().unwrap(), ok.to_sql());
    }

    #[test]
    fn parse_type_names() {
        assert_eq!("Serial".parse::<FieldType>().unwrap(), FieldType::Serial);
        assert_eq!(
            "date".parse::<FieldType>().unwrap(),
            FieldType::Date { time: true }
        );
        assert!("uuid".parse::<FieldType>().is_err());
    }
}
