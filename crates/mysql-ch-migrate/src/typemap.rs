//! Type mapping between MySQL and ClickHouse.

/// Map a raw MySQL type name to the ClickHouse column type.
///
/// Total over any input: size suffixes (`varchar(255)`) and the
/// `unsigned` modifier are normalized away before lookup, and anything
/// unrecognized falls back to `String`.
pub fn mysql_to_clickhouse(raw_type: &str) -> &'static str {
    let lowered = raw_type.to_lowercase();

    // Strip a size/precision suffix: "varchar(255)" -> "varchar",
    // "decimal(18,4) unsigned" -> "decimal unsigned".
    let without_size = match (lowered.find('('), lowered.find(')')) {
        (Some(open), Some(close)) if close > open => {
            format!("{} {}", &lowered[..open], &lowered[close + 1..])
        }
        (Some(open), _) => lowered[..open].to_string(),
        _ => lowered.clone(),
    };

    let unsigned = without_size.contains("unsigned");
    let base_name = without_size.split_whitespace().next().unwrap_or_default();

    match (base_name, unsigned) {
        ("tinyint", false) => "Int8",
        ("tinyint", true) => "UInt8",
        ("smallint", false) => "Int16",
        ("smallint", true) => "UInt16",
        ("mediumint" | "int" | "integer", false) => "Int32",
        ("mediumint" | "int" | "integer", true) => "UInt32",
        ("bigint", false) => "Int64",
        ("bigint", true) => "UInt64",
        ("float", _) => "Float32",
        ("double" | "real" | "decimal" | "numeric", _) => "Float64",
        ("date", _) => "Date",
        ("datetime" | "timestamp", _) => "DateTime",
        ("year", _) => "Int16",
        _ => "String",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_types() {
        assert_eq!(mysql_to_clickhouse("int"), "Int32");
        assert_eq!(mysql_to_clickhouse("bigint"), "Int64");
        assert_eq!(mysql_to_clickhouse("smallint"), "Int16");
        assert_eq!(mysql_to_clickhouse("tinyint"), "Int8");
        assert_eq!(mysql_to_clickhouse("mediumint"), "Int32");
    }

    #[test]
    fn test_unsigned_variants() {
        assert_eq!(mysql_to_clickhouse("int unsigned"), "UInt32");
        assert_eq!(mysql_to_clickhouse("bigint unsigned"), "UInt64");
        assert_eq!(mysql_to_clickhouse("tinyint(1) unsigned"), "UInt8");
    }

    #[test]
    fn test_size_suffix_normalized() {
        assert_eq!(mysql_to_clickhouse("varchar(255)"), "String");
        assert_eq!(mysql_to_clickhouse("char(36)"), "String");
        assert_eq!(mysql_to_clickhouse("int(11)"), "Int32");
        assert_eq!(mysql_to_clickhouse("decimal(18,4)"), "Float64");
    }

    #[test]
    fn test_temporal_types() {
        assert_eq!(mysql_to_clickhouse("datetime"), "DateTime");
        assert_eq!(mysql_to_clickhouse("timestamp"), "DateTime");
        assert_eq!(mysql_to_clickhouse("date"), "Date");
    }

    #[test]
    fn test_float_and_decimal() {
        assert_eq!(mysql_to_clickhouse("float"), "Float32");
        assert_eq!(mysql_to_clickhouse("double"), "Float64");
        assert_eq!(mysql_to_clickhouse("decimal"), "Float64");
    }

    #[test]
    fn test_unknown_maps_to_string() {
        assert_eq!(mysql_to_clickhouse("geometry"), "String");
        assert_eq!(mysql_to_clickhouse("json"), "String");
        assert_eq!(mysql_to_clickhouse(""), "String");
        assert_eq!(mysql_to_clickhouse("no_such_type(10)"), "String");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(mysql_to_clickhouse("INT"), "Int32");
        assert_eq!(mysql_to_clickhouse("VarChar(64)"), "String");
        assert_eq!(mysql_to_clickhouse("DATETIME"), "DateTime");
    }
}
