//! Verbose keys: fully qualified, kind-prefixed names of source objects.
//!
//! Keys are lower-cased because the tabular engine treats object names
//! case-insensitively.

pub fn catalog(name: &str) -> String {
    format!("catalog:{}", name.to_lowercase())
}

pub fn connection(label: &str) -> String {
    format!("connection:{}", label.to_lowercase())
}

pub fn model(name: &str) -> String {
    format!("model:{}", name.to_lowercase())
}

pub fn dataset(table: &str) -> String {
    format!("dataset:{}", table.to_lowercase())
}

pub fn dimension(table: &str) -> String {
    format!("dimension:{}", table.to_lowercase())
}

/// A metric synthesized from `FUNCTION(table[column])`.
pub fn aggregate(function: &str, table: &str, column: &str) -> String {
    format!(
        "aggregate:{}:{}:{}",
        function.to_lowercase(),
        table.to_lowercase(),
        column.to_lowercase()
    )
}

/// A measure defined on a source table, simple or calculated.
pub fn measure(table: &str, name: &str) -> String {
    format!("measure:{}:{}", table.to_lowercase(), name.to_lowercase())
}

pub fn hierarchy(table: &str, name: &str) -> String {
    format!("hierarchy:{}:{}", table.to_lowercase(), name.to_lowercase())
}

/// The level attribute keyed by a source column.
pub fn level(table: &str, column: &str) -> String {
    format!("level:{}:{}", table.to_lowercase(), column.to_lowercase())
}

pub fn secondary_attribute(table: &str, column: &str) -> String {
    format!("attribute:{}:{}", table.to_lowercase(), column.to_lowercase())
}

pub fn relationship(from_table: &str, from_column: &str, to_table: &str, to_column: &str) -> String {
    format!(
        "relationship:{}.{}->{}.{}",
        from_table.to_lowercase(),
        from_column.to_lowercase(),
        to_table.to_lowercase(),
        to_column.to_lowercase()
    )
}

/// The dimension-to-dimension twin of [`relationship`].
pub fn embedded_relationship(
    from_table: &str,
    from_column: &str,
    to_table: &str,
    to_column: &str,
) -> String {
    format!(
        "{}:embedded",
        relationship(from_table, from_column, to_table, to_column)
    )
}

/// The synthesized join from a table's dataset to its own dimension.
pub fn self_relationship(table: &str) -> String {
    format!("relationship:self:{}", table.to_lowercase())
}

pub fn perspective(name: &str) -> String {
    format!("perspective:{}", name.to_lowercase())
}
