//! # SCIM Schema Validator
//!
//! A command-line utility for validating SCIM schema files before they are
//! registered with a [`SchemaRegistry`].
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin schema-validator schemas/User.json
//! cargo run --bin schema-validator ./schemas/
//! ```
//!
//! ## Output Examples
//!
//! ```text
//! Validating schema file: schemas/User.json
//! ✓ Schema is valid!
//!
//! Schema Summary:
//!   ID: urn:ietf:params:scim:schemas:core:2.0:User
//!   Name: User
//!   Attributes: 21
//!   Required attributes: 1
//!   Multi-valued attributes: 9
//! ```
//!
//! ## Validation Rules
//!
//! - Must be valid JSON with `id`, `name` and `attributes`
//! - Schema ID must be a URI (starts with `urn:` or `http`)
//! - Attribute names are unique (case-insensitive) within their container
//! - Complex attributes must have sub-attributes, and only complex ones may
//! - Complex attributes may not nest complex sub-attributes
//! - Canonical values only on string and reference attributes
//!
//! For a directory, the schemas are additionally registered together, one
//! resource type each, which catches conflicting definitions of the same URN.
//!
//! ## Exit Codes
//!
//! - `0`: All schemas are valid
//! - `1`: One or more schemas are invalid or validation error occurred

use scim_core::schema::{AttributeDefinition, ResourceType, Schema, SchemaRegistry};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <schema-file-or-directory>", args[0]);
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  {} schemas/User.json", args[0]);
        eprintln!("  {} ./schemas/", args[0]);
        process::exit(1);
    }

    let path = Path::new(&args[1]);

    if path.is_file() {
        validate_single_file(path);
    } else if path.is_dir() {
        validate_directory(path);
    } else {
        eprintln!(
            "Error: '{}' is not a valid file or directory",
            path.display()
        );
        process::exit(1);
    }
}

fn validate_single_file(file_path: &Path) {
    println!("Validating schema file: {}", file_path.display());

    match load_and_validate_schema(file_path) {
        Ok(schema) => {
            println!("✓ Schema is valid!");
            print_schema_summary(&schema);
        }
        Err(e) => {
            eprintln!("❌ Schema validation failed: {}", e);
            process::exit(1);
        }
    }
}

fn validate_directory(dir_path: &Path) {
    println!("Validating schemas in directory: {}", dir_path.display());

    let files = match json_files(dir_path) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error reading directory: {}", e);
            process::exit(1);
        }
    };

    let mut schemas = Vec::new();
    let mut error_count = 0;

    for path in files {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("\nValidating: {}", file_name);

        match load_and_validate_schema(&path) {
            Ok(schema) => {
                println!("  ✓ Valid - {} ({})", schema.name, schema.id);
                schemas.push(schema);
            }
            Err(e) => {
                eprintln!("  ❌ Invalid - {}", e);
                error_count += 1;
            }
        }
    }

    println!("\nValidation Summary:");
    println!("  Valid schemas: {}", schemas.len());
    println!("  Invalid schemas: {}", error_count);

    if error_count > 0 {
        process::exit(1);
    }

    println!("\nTesting schema registry loading...");
    match build_registry(schemas) {
        Ok(registry) => {
            println!("✓ Schema registry loaded successfully");
            let schemas = registry.get_all_schemas();
            println!("  Total schemas loaded: {}", schemas.len());
            for schema in schemas {
                println!("    - {} ({})", schema.name, schema.id);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to load schema registry: {}", e);
            process::exit(1);
        }
    }
}

fn json_files(dir_path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Register every schema as its own resource type.
fn build_registry(schemas: Vec<Schema>) -> Result<SchemaRegistry, Box<dyn std::error::Error>> {
    let mut builder = SchemaRegistry::builder();
    for schema in schemas {
        let resource_type = ResourceType::new(
            schema.name.clone(),
            format!("/{}", schema.name),
            schema.id.clone(),
        );
        builder.register(resource_type, schema, Vec::new())?;
    }
    Ok(builder.build())
}

fn load_and_validate_schema(file_path: &Path) -> Result<Schema, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file_path)?;

    let json_value: serde_json::Value = serde_json::from_str(&content)?;
    let obj = json_value
        .as_object()
        .ok_or("Schema must be a JSON object")?;

    for field in ["id", "name", "attributes"] {
        if !obj.contains_key(field) {
            return Err(format!("Schema missing required '{}' field", field).into());
        }
    }

    let schema = Schema::from_json(&content)?;

    if !schema.id.starts_with("urn:") && !schema.id.starts_with("http") {
        return Err("Schema ID should be a URI (starting with 'urn:' or 'http')".into());
    }
    if schema.name.is_empty() {
        return Err("Schema name cannot be empty".into());
    }
    if schema.attributes().is_empty() {
        return Err("Schema must have at least one attribute".into());
    }

    Ok(schema)
}

fn print_schema_summary(schema: &Schema) {
    let attributes = schema.attributes();

    println!();
    println!("Schema Summary:");
    println!("  ID: {}", schema.id);
    println!("  Name: {}", schema.name);
    println!("  Description: {}", schema.description);
    println!("  Attributes: {}", attributes.len());

    let mut type_counts = BTreeMap::new();
    for attr in attributes {
        *type_counts
            .entry(format!("{:?}", attr.data_type()))
            .or_insert(0) += 1;
    }
    let required: Vec<&str> = attributes
        .iter()
        .filter(|attr| attr.is_required())
        .map(AttributeDefinition::name)
        .collect();
    let multi_valued = attributes.iter().filter(|attr| attr.is_multi_valued()).count();

    println!("  Required attributes: {}", required.len());
    println!("  Multi-valued attributes: {}", multi_valued);
    println!("  Attribute types:");
    for (attr_type, count) in type_counts {
        println!("    - {}: {}", attr_type, count);
    }

    if !required.is_empty() {
        println!("  Required attribute names: {}", required.join(", "));
    }
}
