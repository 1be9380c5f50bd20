//! Wire-format tests: every spec type dumps to its documented JSON, loads back
//! equal, and reports violations per field.

use modelhost_spec::spec::{FieldErrors, ScheduleOutputSpec};
use modelhost_spec::{
    DataSpec, FileSpec, ScheduleDataSpec, ScheduleInputSpec, ScheduleInputTimeSeriesSpec,
    ScheduleOutputTimeSeriesSpec, Spec, SpecDocument, SpecError, TimeSeriesSpec,
};
use serde_json::{json, Value};
use std::fmt::Debug;

fn assert_wire_form<T>(spec: T, primitive: Value)
where
    T: SpecDocument + PartialEq + Debug,
{
    assert_eq!(spec.dump().unwrap(), primitive, "dump");
    assert_eq!(T::load(primitive).unwrap(), spec, "load");
    let json = spec.to_json().unwrap();
    assert_eq!(T::from_json(&json).unwrap(), spec, "from_json");
    spec.validate().unwrap();
}

fn assert_field_errors<T: SpecDocument + Debug>(primitive: Value, expected: Value) {
    let from_value = T::load(primitive.clone()).unwrap_err();
    let from_text = T::from_json(&primitive.to_string()).unwrap_err();
    for err in [from_value, from_text] {
        let errors: &FieldErrors = err
            .field_errors()
            .unwrap_or_else(|| panic!("expected field errors, got {err}"));
        assert_eq!(serde_json::to_value(errors).unwrap(), expected);
    }
}

// ── Valid documents ──────────────────────────────────────────────────

#[test]
fn minimal_file_spec() {
    assert_wire_form(FileSpec::new(6), json!({"id": 6}));
}

#[test]
fn minimal_time_series_spec() {
    assert_wire_form(
        TimeSeriesSpec::new(6, 123, 234).unwrap(),
        json!({"id": 6, "start": 123, "end": 234}),
    );
}

#[test]
fn time_series_include_outside_points() {
    let spec = TimeSeriesSpec::builder(6, 123, 234)
        .include_outside_points(true)
        .build()
        .unwrap();
    assert_wire_form(
        spec,
        json!({"id": 6, "start": 123, "end": 234, "includeOutsidePoints": true}),
    );
}

#[test]
fn time_series_aggregate() {
    let spec = TimeSeriesSpec::builder(6, 123, 234)
        .aggregate("average")
        .granularity("1m")
        .build()
        .unwrap();
    assert_wire_form(
        spec,
        json!({"id": 6, "start": 123, "end": 234, "aggregate": "average", "granularity": "1m"}),
    );
}

#[test]
fn aggregate_aliases_load_as_canonical() {
    let alias = TimeSeriesSpec::load(
        json!({"id": 6, "start": 123, "end": 234, "aggregate": "avg", "granularity": "1m"}),
    )
    .unwrap();
    let canonical = TimeSeriesSpec::builder(6, 123, 234)
        .aggregate("average")
        .granularity("1m")
        .build()
        .unwrap();
    assert_eq!(alias, canonical);
}

#[test]
fn schedule_input_time_series() {
    let spec = ScheduleInputTimeSeriesSpec::builder(6)
        .aggregate("max")
        .granularity("1m")
        .build()
        .unwrap();
    assert_wire_form(spec, json!({"id": 6, "aggregate": "max", "granularity": "1m"}));
}

#[test]
fn empty_data_spec() {
    assert_wire_form(DataSpec::new(), json!({}));
}

#[test]
fn full_data_spec() {
    let spec = DataSpec::builder()
        .time_series("ts1", TimeSeriesSpec::new(6, 123, 234).unwrap())
        .time_series("ts2", TimeSeriesSpec::new(7, 1234, 2345).unwrap())
        .file("f1", FileSpec::new(3))
        .file("f2", FileSpec::new(4))
        .build()
        .unwrap();
    assert_wire_form(
        spec,
        json!({
            "timeSeries": {
                "ts1": {"id": 6, "start": 123, "end": 234},
                "ts2": {"id": 7, "start": 1234, "end": 2345}
            },
            "files": {"f1": {"id": 3}, "f2": {"id": 4}}
        }),
    );
}

#[test]
fn full_schedule_data_spec() {
    let input = ScheduleInputSpec::builder("1m", "5m")
        .start(0)
        .time_series("ts1", ScheduleInputTimeSeriesSpec::new(6))
        .time_series("ts2", ScheduleInputTimeSeriesSpec::new(7))
        .build()
        .unwrap();
    let output = ScheduleOutputSpec::builder()
        .time_series("out", ScheduleOutputTimeSeriesSpec::new(8).with_offset("-1m").unwrap())
        .build()
        .unwrap();
    assert_wire_form(
        ScheduleDataSpec::new(input, output),
        json!({
            "input": {
                "stride": 60000,
                "windowSize": 300000,
                "start": 0,
                "timeSeries": {"ts1": {"id": 6}, "ts2": {"id": 7}}
            },
            "output": {"timeSeries": {"out": {"id": 8, "offset": -60000}}}
        }),
    );
}

#[test]
fn tagged_documents_dispatch_on_kind() {
    let spec = Spec::from_json(r#"{"kind": "data", "files": {"model": {"id": 11}}}"#).unwrap();
    assert_eq!(spec.kind(), "data");
    match spec {
        Spec::Data(data) => assert_eq!(data.files()["model"].id(), 11),
        other => panic!("unexpected spec {other:?}"),
    }
}

// ── Invalid documents ────────────────────────────────────────────────

#[test]
fn aggregate_without_granularity() {
    assert_field_errors::<TimeSeriesSpec>(
        json!({"id": 6, "start": 123, "end": 234, "aggregate": "avg"}),
        json!({"granularity": ["granularity must be specified for aggregates"]}),
    );
}

#[test]
fn aggregate_with_outside_points() {
    assert_field_errors::<TimeSeriesSpec>(
        json!({
            "id": 6, "start": 123, "end": 234,
            "aggregate": "avg", "granularity": "1m", "includeOutsidePoints": true
        }),
        json!({"includeOutsidePoints": ["can't include outside points for aggregates"]}),
    );
}

#[test]
fn nested_errors_follow_document_shape() {
    assert_field_errors::<DataSpec>(
        json!({
            "timeSeries": {
                "good": {"id": 1, "start": 0, "end": 10},
                "bad": {"id": 2, "start": 10, "end": 0}
            },
            "files": {"": {"id": 3}}
        }),
        json!({
            "timeSeries": {"bad": {"end": ["end must be after start"]}},
            "files": {"": ["alias must not be empty"]}
        }),
    );
}

#[test]
fn schedule_input_series_with_range_is_malformed() {
    let err = ScheduleInputTimeSeriesSpec::load(json!({"id": 6, "start": 123, "end": 234}))
        .unwrap_err();
    assert!(matches!(err, SpecError::Malformed(_)));
}

#[test]
fn missing_required_fields_are_malformed() {
    assert!(matches!(FileSpec::load(json!({})), Err(SpecError::Malformed(_))));
    assert!(matches!(
        TimeSeriesSpec::load(json!({})),
        Err(SpecError::Malformed(_))
    ));
    assert!(matches!(
        ScheduleDataSpec::load(json!({"input": {"stride": 1, "windowSize": 1, "start": 0}})),
        Err(SpecError::Malformed(_))
    ));
}

#[test]
fn duplicate_alias_across_maps_in_text() {
    let err = DataSpec::from_json(
        r#"{"timeSeries": {"x": {"id": 1, "start": 0, "end": 10}}, "files": {"x": {"id": 2}}}"#,
    )
    .unwrap_err();
    let errors = err.field_errors().unwrap();
    assert_eq!(
        errors.nested("files").unwrap().messages("x").unwrap(),
        ["alias `x` is declared more than once"]
    );
}

#[test]
fn error_display_is_pretty_json() {
    let err = TimeSeriesSpec::builder(6, 123, 234)
        .granularity("1m")
        .build()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid spec: {\n  \"granularity\": [\n    \"granularity can only be specified for aggregates\"\n  ]\n}"
    );
}
