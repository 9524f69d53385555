//! Tests for plotgraph-shells: registry, datasets, tool schemas, validator and compiler

use plotgraph_core::{DatasetProfile, Error, SemanticType};
use plotgraph_shells::*;
use serde_json::{json, Value};

fn heart_profile() -> DatasetProfile {
    DatasetProfile::new(303)
        .with_field("Age", SemanticType::Quantitative, 60)
        .with_field("Category", SemanticType::Nominal, 2)
}

fn heart_rows() -> Vec<plotgraph_core::Row> {
    Dataset::from_csv("Age,Category\n63,a\n37,b\n41,a\n").unwrap().rows()
}

fn bar_aggregate() -> ShellDefinition {
    ShellRegistry::builtin().get("bar_aggregate").unwrap().clone()
}

// ===========================================================================
// ShellRegistry
// ===========================================================================

#[test]
fn builtin_registry_has_all_shells_sorted() {
    let reg = ShellRegistry::builtin();
    assert_eq!(
        reg.ids(),
        vec![
            "bar_aggregate",
            "bar_count",
            "boxplot",
            "density",
            "heatmap_correlation",
            "histogram",
            "line_ordered",
            "line_time",
            "scatter",
        ]
    );
    assert_eq!(reg.len(), 9);
}

#[test]
fn lookup_unknown_shell_is_error() {
    let reg = ShellRegistry::builtin();
    let err = reg.lookup("pie").unwrap_err();
    assert!(matches!(err, Error::UnknownShell(ref id) if id == "pie"));
}

#[test]
fn registry_accepts_synthetic_shells() {
    let mut reg = ShellRegistry::new();
    assert!(reg.is_empty());
    reg.register(ShellDefinition::new("custom", "Custom", ShellFamily::Trend, Mark::Line));
    assert!(reg.contains("custom"));
    assert!(!reg.contains("scatter"));
}

#[test]
fn heatmap_declares_analysis() {
    let reg = ShellRegistry::builtin();
    let shell = reg.get("heatmap_correlation").unwrap();
    let analysis = shell.analysis.as_ref().unwrap();
    assert_eq!(analysis.language, "python");
    assert_eq!(analysis.id, "correlation_matrix");
    assert!(shell.required.is_empty());
}

#[test]
fn shell_definition_serializes_aggregate_flags() {
    let v = serde_json::to_value(ShellRegistry::builtin().get("histogram").unwrap()).unwrap();
    assert_eq!(v["required"]["x"], json!({"type": "quantitative", "bin": true}));
    assert_eq!(v["required"]["y"], json!({"type": "quantitative", "aggregate": "count"}));
    assert_eq!(v["optional"]["tooltip"], "any");
    let v = serde_json::to_value(bar_aggregate()).unwrap();
    assert_eq!(v["required"]["y"]["aggregate"], true);
    assert_eq!(v["constraints"]["aggregateRequired"], true);
}

// ===========================================================================
// Dataset
// ===========================================================================

#[test]
fn rows_carry_every_header() {
    let ds = Dataset::from_csv("a,b,c\n1,,x\n2.5,\"q, r\"\n").unwrap();
    let rows = ds.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["a"], json!(1));
    assert_eq!(rows[0]["b"], Value::Null);
    assert_eq!(rows[0]["c"], "x");
    assert_eq!(rows[1]["a"], json!(2.5));
    assert_eq!(rows[1]["b"], "q, r");
    assert_eq!(rows[1]["c"], Value::Null);
}

#[test]
fn profile_csv_end_to_end() {
    let p = profile_csv("Age,Category,When\n63,a,2024-01-01\n37,b,2024-02-01\n\n41,a,2024-03-01\n").unwrap();
    assert_eq!(p.row_count, 3);
    assert_eq!(p.fields["Age"].field_type, SemanticType::Quantitative);
    assert_eq!(p.fields["Category"].field_type, SemanticType::Nominal);
    assert_eq!(p.fields["Category"].cardinality, 2);
    assert_eq!(p.fields["When"].field_type, SemanticType::Temporal);
}

// ===========================================================================
// Tool schemas
// ===========================================================================

#[test]
fn choose_shell_lists_compatible_shells() {
    let reg = ShellRegistry::builtin();
    let schema = choose_shell_parameters(&reg, &heart_profile());
    let ids: Vec<&str> = schema["properties"]["shellId"]["enum"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(ids.contains(&"bar_aggregate"));
    assert!(ids.contains(&"scatter"));
    assert!(ids.contains(&"histogram"));
    assert!(!ids.contains(&"line_time"));
    assert_eq!(schema["required"], json!(["shellId"]));
    assert_eq!(schema["additionalProperties"], false);
}

#[test]
fn choose_shell_falls_back_to_all_ids() {
    let reg = ShellRegistry::builtin();
    let schema = choose_shell_parameters(&reg, &DatasetProfile::new(0));
    assert_eq!(schema["properties"]["shellId"]["enum"].as_array().unwrap().len(), reg.len());
}

#[test]
fn fill_params_enumerates_legal_columns() {
    let schema = fill_params_parameters(&bar_aggregate(), &heart_profile());
    let props = &schema["properties"];
    assert_eq!(props["x"]["enum"], json!(["Category"]));
    assert_eq!(props["y"]["enum"], json!(["Age"]));
    assert_eq!(props["color"]["enum"], json!(["Category"]));
    assert_eq!(props["tooltip"]["enum"], json!(["Age", "Category"]));
    assert_eq!(props["aggregate"]["enum"], json!(["count", "sum", "mean", "median", "min", "max"]));
    assert!(props.get("bin").is_none());
    assert_eq!(schema["required"], json!(["x", "y", "aggregate"]));
}

#[test]
fn fill_params_skips_fixed_literal_and_offers_bin() {
    let reg = ShellRegistry::builtin();
    let schema = fill_params_parameters(reg.get("histogram").unwrap(), &heart_profile());
    let props = &schema["properties"];
    assert_eq!(props["x"]["enum"], json!(["Age"]));
    assert!(props.get("y").is_none());
    assert!(props.get("aggregate").is_none());
    assert_eq!(props["bin"]["type"], "boolean");
    assert_eq!(schema["required"], json!(["x"]));
}

#[test]
fn fill_params_temporal_accepts_quantitative() {
    let reg = ShellRegistry::builtin();
    let schema = fill_params_parameters(reg.get("line_time").unwrap(), &heart_profile());
    assert_eq!(schema["properties"]["x"]["enum"], json!(["Age"]));
}

#[test]
fn fill_params_omits_encodings_without_columns() {
    let reg = ShellRegistry::builtin();
    let profile = DatasetProfile::new(10).with_field("v", SemanticType::Quantitative, 10);
    let schema = fill_params_parameters(reg.get("bar_aggregate").unwrap(), &profile);
    assert!(schema["properties"].get("x").is_none());
    assert_eq!(schema["required"], json!(["y", "aggregate"]));
}

// ===========================================================================
// Validator: scenarios
// ===========================================================================

#[test]
fn mistyped_x_is_invalid_field_type() {
    let params = ShellParams::new()
        .with("x", "Age")
        .with("y", "Age")
        .with_aggregate(AggregateOp::Mean);
    let result = Validator::default().validate(&bar_aggregate(), &params, &heart_profile());
    assert!(!result.ok);
    let err = result
        .errors
        .iter()
        .find(|e| e.code == IssueCode::InvalidFieldType)
        .unwrap();
    let details = err.details.as_ref().unwrap();
    assert_eq!(details["encoding"], "x");
    assert_eq!(details["field"], "Age");
    assert_eq!(details["expected"], "nominal");
    assert_eq!(details["actual"], "quantitative");
}

#[test]
fn valid_bar_aggregate_compiles() {
    let shell = bar_aggregate();
    let params = ShellParams::new()
        .with("x", "Category")
        .with("y", "Age")
        .with_aggregate(AggregateOp::Mean);
    let result = Validator::default().validate(&shell, &params, &heart_profile());
    assert!(result.ok, "{:?}", result.errors);
    assert!(result.errors.is_empty());
    assert!(result.warnings.is_empty());

    let spec = compile(&shell, &params, heart_rows());
    assert_eq!(spec.encoding["x"], json!({"field": "Category", "type": "nominal"}));
    assert_eq!(
        spec.encoding["y"],
        json!({"field": "Age", "type": "quantitative", "aggregate": "mean"})
    );
    assert_eq!(spec.mark.kind, "bar");
    assert_eq!(spec.schema, VEGA_LITE_SCHEMA);
    assert!(spec.encoding.get("color").is_none());
}

#[test]
fn missing_aggregate_is_single_error() {
    let params = ShellParams::new().with("x", "Category").with("y", "Age");
    let result = Validator::default().validate(&bar_aggregate(), &params, &heart_profile());
    assert!(!result.ok);
    assert_eq!(result.error_codes(), vec![IssueCode::AggregateMissing]);
}

// ===========================================================================
// Validator: stages
// ===========================================================================

#[test]
fn missing_required_encoding_and_signature() {
    let params = ShellParams::new().with("y", "Age").with_aggregate(AggregateOp::Sum);
    let result = Validator::default().validate(&bar_aggregate(), &params, &heart_profile());
    assert_eq!(
        result.error_codes(),
        vec![IssueCode::MissingRequiredEncoding, IssueCode::InvalidSignature]
    );
    assert_eq!(result.errors[0].details.as_ref().unwrap()["encoding"], "x");
}

#[test]
fn null_and_empty_count_as_missing() {
    let params: ShellParams =
        serde_json::from_value(json!({"x": null, "y": "", "aggregate": "mean"})).unwrap();
    let result = Validator::default().validate(&bar_aggregate(), &params, &heart_profile());
    let missing = result
        .errors
        .iter()
        .filter(|e| e.code == IssueCode::MissingRequiredEncoding)
        .count();
    assert_eq!(missing, 2);
}

#[test]
fn unknown_field_reported() {
    let params = ShellParams::new()
        .with("x", "Nope")
        .with("y", "Age")
        .with_aggregate(AggregateOp::Mean);
    let result = Validator::default().validate(&bar_aggregate(), &params, &heart_profile());
    assert!(result.has_error(IssueCode::UnknownField));
    assert!(result.has_error(IssueCode::InvalidSignature));
}

#[test]
fn fixed_literal_needs_no_column_or_aggregate() {
    let reg = ShellRegistry::builtin();
    let params = ShellParams::new().with("x", "Category");
    let result = Validator::default().validate(reg.get("bar_count").unwrap(), &params, &heart_profile());
    assert!(result.ok, "{:?}", result.errors);
}

#[test]
fn temporal_encoding_accepts_quantitative() {
    let reg = ShellRegistry::builtin();
    let params = ShellParams::new().with("x", "Age").with("y", "Age");
    let result = Validator::default().validate(reg.get("line_time").unwrap(), &params, &heart_profile());
    assert!(result.ok, "{:?}", result.errors);
}

#[test]
fn bin_flag_on_nominal_x_is_invalid_target() {
    let reg = ShellRegistry::builtin();
    let params = ShellParams::new().with("x", "Category").with_bin(true);
    let result = Validator::default().validate(reg.get("histogram").unwrap(), &params, &heart_profile());
    assert!(result.has_error(IssueCode::InvalidBinTarget));
    assert!(result.has_error(IssueCode::InvalidFieldType));
}

fn binned_shell() -> ShellDefinition {
    ShellDefinition::new("binned", "Binned", ShellFamily::Distribution, Mark::Bar)
        .signature(&[SemanticType::Quantitative])
        .signature(&[SemanticType::Nominal])
        .require("x", EncodingConstraint::new(SemanticType::Quantitative).binned())
        .bin_required()
}

#[test]
fn mandated_bin_fails_for_non_quantitative_column() {
    let shell = binned_shell();
    let profile = heart_profile();
    let validator = Validator::default();
    for bin in [None, Some(false), Some(true)] {
        let mut params = ShellParams::new().with("x", "Category");
        params.bin = bin;
        let result = validator.validate(&shell, &params, &profile);
        assert!(!result.ok, "bin {bin:?} on a nominal column should fail");
    }
    let result = validator.validate(&shell, &ShellParams::new().with("x", "Age"), &profile);
    assert_eq!(result.error_codes(), vec![IssueCode::BinMissing]);
    let ok = validator.validate(&shell, &ShellParams::new().with("x", "Age").with_bin(true), &profile);
    assert!(ok.ok);
}

#[test]
fn validation_is_deterministic() {
    let validator = Validator::default();
    let params = ShellParams::new().with("x", "Age").with("color", "Nope");
    let a = validator.validate(&bar_aggregate(), &params, &heart_profile());
    let b = validator.validate(&bar_aggregate(), &params, &heart_profile());
    assert_eq!(a, b);
    assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
}

#[test]
fn validate_by_id_unknown_shell() {
    let reg = ShellRegistry::builtin();
    let result = Validator::default().validate_by_id(&reg, "pie", &ShellParams::new(), &heart_profile());
    assert!(!result.ok);
    assert_eq!(result.error_codes(), vec![IssueCode::UnknownShell]);
}

// ===========================================================================
// Validator: whole matrix and warnings
// ===========================================================================

#[test]
fn whole_matrix_needs_two_quantitative_columns() {
    let reg = ShellRegistry::builtin();
    let shell = reg.get("heatmap_correlation").unwrap();
    let validator = Validator::default();

    let result = validator.validate(shell, &ShellParams::new(), &heart_profile());
    assert_eq!(result.error_codes(), vec![IssueCode::NotEnoughQuantitativeFields]);

    let profile = heart_profile().with_field("Chol", SemanticType::Quantitative, 150);
    let result = validator.validate(shell, &ShellParams::new(), &profile);
    assert!(result.ok);
}

fn wide_profile(rows: usize) -> DatasetProfile {
    DatasetProfile::new(rows)
        .with_field("Country", SemanticType::Nominal, 150)
        .with_field("Region", SemanticType::Nominal, 21)
        .with_field("Year", SemanticType::Quantitative, 500)
        .with_field("Value", SemanticType::Quantitative, 900)
}

#[test]
fn warnings_accompany_success() {
    let params = ShellParams::new()
        .with("x", "Country")
        .with("y", "Value")
        .with("color", "Region")
        .with_aggregate(AggregateOp::Sum);
    let result = Validator::default().validate(&bar_aggregate(), &params, &wide_profile(5001));
    assert!(result.ok);
    assert_eq!(
        result.warning_codes(),
        vec![
            IssueCode::HighCardinalityColor,
            IssueCode::HighCardinalityX,
            IssueCode::LargeDatasetEmbedded,
        ]
    );
}

#[test]
fn warnings_respect_thresholds() {
    let reg = ShellRegistry::builtin();
    let params = ShellParams::new().with("x", "Year").with("y", "Value");
    let result = Validator::default().validate(reg.get("scatter").unwrap(), &params, &wide_profile(5000));
    assert!(result.ok);
    assert!(result.warnings.is_empty(), "quantitative x never warns");

    let strict = Validator::new(ValidationThresholds {
        color_cardinality: 20,
        axis_cardinality: 100,
        embed_rows: 10,
    });
    let result = strict.validate(reg.get("scatter").unwrap(), &params, &wide_profile(11));
    assert_eq!(result.warning_codes(), vec![IssueCode::LargeDatasetEmbedded]);
}

#[test]
fn validation_result_serializes_codes() {
    let params = ShellParams::new().with("x", "Category").with("y", "Age");
    let result = Validator::default().validate(&bar_aggregate(), &params, &heart_profile());
    let v = serde_json::to_value(&result).unwrap();
    assert_eq!(v, json!({"ok": false, "errors": [{"code": "aggregate_missing"}], "warnings": []}));
}

// ===========================================================================
// Compiler
// ===========================================================================

#[test]
fn compile_histogram_attaches_bin_and_count() {
    let reg = ShellRegistry::builtin();
    let params = ShellParams::new().with("x", "Age").with_bin(true);
    let spec = compile(reg.get("histogram").unwrap(), &params, heart_rows());
    assert_eq!(spec.encoding["x"], json!({"field": "Age", "type": "quantitative", "bin": true}));
    assert_eq!(spec.encoding["y"], json!({"type": "quantitative", "aggregate": "count"}));
}

#[test]
fn mark_names_match_wire_form() {
    for mark in [Mark::Bar, Mark::Boxplot, Mark::Area, Mark::Rect, Mark::Line, Mark::Point] {
        assert_eq!(serde_json::to_value(mark).unwrap(), json!(mark.as_str()));
        assert_eq!(mark.to_string(), mark.as_str());
    }
    let reg = ShellRegistry::builtin();
    let spec = compile(reg.get("boxplot").unwrap(), &ShellParams::new(), heart_rows());
    assert_eq!(spec.mark.kind, "boxplot");
}

#[test]
fn fixed_aggregate_ignores_caller_choice() {
    let reg = ShellRegistry::builtin();
    let params = ShellParams::new()
        .with("x", "Category")
        .with_aggregate(AggregateOp::Max);
    let spec = compile(reg.get("bar_count").unwrap(), &params, heart_rows());
    assert_eq!(spec.encoding["y"]["aggregate"], "count");
}

#[test]
fn compile_optional_any_has_no_type() {
    let params = ShellParams::new()
        .with("x", "Category")
        .with("y", "Age")
        .with("color", "Category")
        .with("tooltip", "Age")
        .with_aggregate(AggregateOp::Mean);
    let spec = compile(&bar_aggregate(), &params, heart_rows());
    assert_eq!(spec.encoding["color"], json!({"field": "Category", "type": "nominal"}));
    assert_eq!(spec.encoding["tooltip"], json!({"field": "Age"}));
    let channels: Vec<&str> = spec.encoding.keys().map(|k| k.as_str()).collect();
    assert_eq!(channels, vec!["x", "y", "color", "tooltip"]);
}

#[test]
fn compile_density_emits_transform() {
    let reg = ShellRegistry::builtin();
    let params = ShellParams::new().with("x", "Age").with("color", "Category");
    let spec = compile(reg.get("density").unwrap(), &params, heart_rows());
    assert_eq!(spec.mark.kind, "area");
    let transform = spec.transform.as_ref().unwrap();
    assert_eq!(
        transform[0],
        json!({"density": "Age", "groupby": ["Category"], "as": ["value", "density"]})
    );
    assert_eq!(spec.encoding["x"], json!({"field": "value", "type": "quantitative"}));
    assert_eq!(spec.encoding["y"], json!({"field": "density", "type": "quantitative"}));
}

#[test]
fn compile_correlation_matrix() {
    let reg = ShellRegistry::builtin();
    let rows: Vec<plotgraph_core::Row> = vec![
        serde_json::from_value(json!({"x": "a", "y": "b", "value": 0.5})).unwrap(),
    ];
    let spec = compile(reg.get("heatmap_correlation").unwrap(), &ShellParams::new(), rows);
    assert_eq!(spec.mark.kind, "rect");
    assert_eq!(spec.encoding["color"]["scale"]["domain"], json!([-1, 1]));
    assert_eq!(spec.encoding["color"]["scale"]["scheme"], "redblue");
    assert_eq!(spec.encoding["tooltip"][2]["format"], ".2f");
    assert!(spec.transform.is_none());
}

#[test]
fn compile_is_byte_reproducible() {
    let params = ShellParams::new()
        .with("x", "Category")
        .with("y", "Age")
        .with_aggregate(AggregateOp::Median);
    let a = compile(&bar_aggregate(), &params, heart_rows()).to_json_pretty();
    let b = compile(&bar_aggregate(), &params, heart_rows()).to_json_pretty();
    assert_eq!(a, b);
    let v: Value = serde_json::from_str(&a).unwrap();
    assert_eq!(v["$schema"], VEGA_LITE_SCHEMA);
    assert_eq!(v["data"]["values"].as_array().unwrap().len(), 3);
}

#[test]
fn compiled_fields_exist_in_rows_after_validation() {
    let reg = ShellRegistry::builtin();
    let csv = "Age,Category,Chol\n63,a,233\n37,b,250\n41,a,204\n";
    let ds = Dataset::from_csv(csv).unwrap();
    let profile = profile(&ds);
    let rows = ds.rows();
    let validator = Validator::default();

    let candidates = [
        ShellParams::new().with("x", "Category").with("y", "Age").with_aggregate(AggregateOp::Mean),
        ShellParams::new().with("x", "Category").with("y", "Chol").with("color", "Category"),
        ShellParams::new().with("x", "Age").with("y", "Chol").with("tooltip", "Category"),
        ShellParams::new().with("x", "Age").with_bin(true),
        ShellParams::new().with("x", "Category"),
        ShellParams::new().with("x", "Chol"),
    ];
    let mut compiled = 0;
    for shell in reg.iter().filter(|s| !s.family.is_whole_matrix()) {
        for params in &candidates {
            if !validator.validate(shell, params, &profile).ok {
                continue;
            }
            let spec = compile(shell, params, rows.clone());
            let fields = spec.referenced_fields();
            let derived = shell.family == ShellFamily::Density;
            for f in fields {
                if derived && (f == "value" || f == "density") {
                    continue;
                }
                assert!(rows[0].contains_key(f), "{} references missing column {}", shell.id, f);
            }
            compiled += 1;
        }
    }
    assert!(compiled >= 5);
}

// ===========================================================================
// ShellParams
// ===========================================================================

#[test]
fn shell_params_flatten_roundtrip() {
    let v = json!({"x": "Category", "y": "Age", "aggregate": "mean"});
    let params = ShellParams::from_value(&v).unwrap();
    assert_eq!(params.aggregate, Some(AggregateOp::Mean));
    assert_eq!(params.column("x"), Some("Category"));
    assert_eq!(Value::Object(params.to_map()), v);
}

#[test]
fn shell_params_reject_unknown_aggregate() {
    assert!(ShellParams::from_value(&json!({"aggregate": "mode"})).is_err());
    assert_eq!(ShellParams::from_value(&Value::Null).unwrap(), ShellParams::default());
}
