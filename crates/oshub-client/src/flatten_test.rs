use serde_json::json;

use super::*;

/// A `POTENTIAL_MATCH` response shaped like the live registry's, trimmed to
/// the fields the flattening rules care about.
fn potential_match_response() -> Value {
    json!({
        "matches": [
            {
                "type": "Feature",
                "id": "CN2019303BQ3FZP",
                "geometry": { "type": "Point", "coordinates": [119.31, 31.95] },
                "properties": {
                    "name": "Jiangsu Textile Mill",
                    "address": "12 Industrial Rd, Changzhou",
                    "country_code": "CN",
                    "os_id": "CN2019303BQ3FZP",
                    "other_names": ["JS Textile", "Jiangsu Mill No. 1"],
                    "other_addresses": [],
                    "contributors": [
                        { "id": 11, "name": "Brand A", "is_verified": false },
                        { "id": 12, "name": "Brand B", "is_verified": true }
                    ],
                    "country_name": "China",
                    "claim_info": null,
                    "other_locations": [
                        { "lat": 31.9, "lng": 119.3, "contributor_id": 11 }
                    ],
                    "is_closed": null,
                    "ppe_product_types": null,
                    "ppe_contact_email": "ops@example.com",
                    "extended_fields": {
                        "name": [
                            { "value": "Jiangsu Textile Mill", "contributor_name": "Brand A" }
                        ],
                        "number_of_workers": []
                    },
                    "created_from": {
                        "created_at": "2019-10-30T12:00:00Z",
                        "contributor": "Brand A"
                    },
                    "sector": ["Apparel"]
                },
                "confidence": 0.87,
                "confirm_match_url": "/api/facility-matches/7001/confirm/",
                "reject_match_url": "/api/facility-matches/7001/reject/"
            },
            {
                "type": "Feature",
                "id": "CN2020111XYZABC",
                "geometry": { "type": "Point", "coordinates": [119.4, 31.8] },
                "properties": { "name": "Changzhou Weaving", "claim_info": null },
                "confidence": 0.61,
                "confirm_match_url": "/api/facility-matches/7002/confirm/",
                "reject_match_url": "/api/facility-matches/7002/reject/"
            }
        ],
        "item_id": 964,
        "geocoded_geometry": { "type": "Point", "coordinates": [119.3, 31.9] },
        "geocoded_address": "Changzhou, Jiangsu, China",
        "status": "POTENTIAL_MATCH",
        "os_id": null
    })
}

#[test]
fn empty_matches_yield_base_record_only() {
    let rows = flatten_facilities(&json!({
        "matches": [],
        "os_id": "X1",
        "status": "NEW_FACILITY"
    }))
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        Value::Object(rows[0].clone()),
        json!({ "os_id": "X1", "status": "NEW_FACILITY" })
    );
    assert!(!rows[0].contains_key("match_no"));
}

#[test]
fn base_record_expands_geometry_and_blanks_nulls() {
    let rows = flatten_facilities(&json!({
        "matches": [],
        "item_id": 5,
        "geocoded_geometry": { "type": "Point", "coordinates": [8.68, 50.11] },
        "geocoded_address": null,
        "status": "NEW_FACILITY"
    }))
    .unwrap();
    let row = &rows[0];
    assert_eq!(row["lon"], json!(8.68));
    assert_eq!(row["lat"], json!(50.11));
    assert_eq!(row["geocoded_address"], json!(""));
    assert!(!row.contains_key("geocoded_geometry"));
}

#[test]
fn unusable_geocoded_geometry_defaults_to_minus_one() {
    let rows = flatten_facilities(&json!({
        "matches": [],
        "geocoded_geometry": null,
        "status": "ERROR_MATCHING"
    }))
    .unwrap();
    assert_eq!(rows[0]["lon"], json!(-1));
    assert_eq!(rows[0]["lat"], json!(-1));
}

#[test]
fn one_row_per_candidate_numbered_in_order() {
    let rows = flatten_facilities(&potential_match_response()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["match_no"], json!(1));
    assert_eq!(rows[1]["match_no"], json!(2));
    assert_eq!(rows[0]["match_id"], json!("CN2019303BQ3FZP"));
    assert_eq!(rows[1]["match_id"], json!("CN2020111XYZABC"));
    // Base columns are repeated on every row.
    for row in &rows {
        assert_eq!(row["status"], json!("POTENTIAL_MATCH"));
        assert_eq!(row["item_id"], json!(964));
        assert_eq!(row["os_id"], json!(""));
    }
}

#[test]
fn match_no_is_the_first_column() {
    let rows = flatten_facilities(&potential_match_response()).unwrap();
    assert_eq!(rows[0].keys().next().map(String::as_str), Some("match_no"));
}

#[test]
fn candidate_geometry_and_scalars_are_prefixed() {
    let rows = flatten_facilities(&potential_match_response()).unwrap();
    let row = &rows[0];
    assert_eq!(row["match_lon"], json!(119.31));
    assert_eq!(row["match_lat"], json!(31.95));
    assert_eq!(row["match_confidence"], json!(0.87));
    assert_eq!(
        row["match_confirm_match_url"],
        json!("/api/facility-matches/7001/confirm/")
    );
    assert_eq!(
        row["match_reject_match_url"],
        json!("/api/facility-matches/7001/reject/")
    );
    assert!(!row.contains_key("match_type"));
    assert!(!row.contains_key("match_geometry"));
}

#[test]
fn properties_are_flattened_one_level() {
    let rows = flatten_facilities(&potential_match_response()).unwrap();
    let row = &rows[0];
    assert_eq!(row["match_name"], json!("Jiangsu Textile Mill"));
    assert_eq!(row["match_country_code"], json!("CN"));
    assert_eq!(row["match_claim_info"], json!(""));
    assert_eq!(row["match_is_closed"], json!(""));
    assert_eq!(row["match_sector"], json!("Apparel"));
}

#[test]
fn string_lists_join_with_newlines() {
    let rows = flatten_facilities(&potential_match_response()).unwrap();
    assert_eq!(
        rows[0]["match_other_names"],
        json!("JS Textile\nJiangsu Mill No. 1")
    );
    assert_eq!(rows[0]["match_other_addresses"], json!(""));
}

#[test]
fn object_lists_render_pipe_separated_pairs() {
    let rows = flatten_facilities(&potential_match_response()).unwrap();
    assert_eq!(
        rows[0]["match_contributors"],
        json!("id:11|name:Brand A|is_verified:False\nid:12|name:Brand B|is_verified:True")
    );
}

#[test]
fn lng_is_rewritten_to_lon() {
    let rows = flatten_facilities(&potential_match_response()).unwrap();
    assert_eq!(
        rows[0]["match_other_locations"],
        json!("lat:31.9|lon:119.3|contributor_id:11")
    );
    for row in &rows {
        for value in row.values() {
            if let Some(text) = value.as_str() {
                assert!(!text.contains("lng:"), "found lng: in {text}");
            }
        }
    }
}

#[test]
fn ppe_scalars_are_skipped() {
    let rows = flatten_facilities(&potential_match_response()).unwrap();
    assert!(!rows[0].contains_key("match_ppe_product_types"));
    assert!(!rows[0].contains_key("match_ppe_contact_email"));
}

#[test]
fn extended_fields_are_shortened() {
    let rows = flatten_facilities(&potential_match_response()).unwrap();
    let row = &rows[0];
    assert_eq!(
        row["match_ef_name"],
        json!("value:Jiangsu Textile Mill|contributor_name:Brand A")
    );
    assert_eq!(row["match_ef_number_of_workers"], json!(""));
    for row in &rows {
        assert!(
            row.keys().all(|k| !k.contains("match_extended_fields_")),
            "unshortened key in {row:?}"
        );
    }
}

#[test]
fn nested_scalar_objects_become_compound_columns() {
    let rows = flatten_facilities(&potential_match_response()).unwrap();
    assert_eq!(
        rows[0]["match_created_from_created_at"],
        json!("2019-10-30T12:00:00Z")
    );
    assert_eq!(rows[0]["match_created_from_contributor"], json!("Brand A"));
}

#[test]
fn flattening_is_idempotent() {
    let raw = potential_match_response();
    let first = flatten_facilities(&raw).unwrap();
    let second = flatten_facilities(&raw).unwrap();
    assert_eq!(first, second);
}

#[test]
fn top_level_list_on_candidate_is_a_schema_violation() {
    let raw = json!({
        "matches": [
            { "id": "A", "properties": { "name": "ok" } },
            { "id": "B", "aliases": ["x", "y"] }
        ],
        "status": "POTENTIAL_MATCH"
    });
    let err = flatten_facilities(&raw).unwrap_err();
    assert!(
        matches!(err, ClientError::SchemaViolation { .. }),
        "expected SchemaViolation, got: {err:?}"
    );
    assert_eq!(err.code(), -4);
}

#[test]
fn non_text_property_list_elements_are_dropped() {
    let raw = json!({
        "matches": [{
            "id": "A",
            "properties": {
                "worker_counts": [10, 20],
                "other_names": ["Alpha", null, "Beta", true]
            }
        }],
        "status": "MATCHED"
    });
    let rows = flatten_facilities(&raw).unwrap();
    assert_eq!(rows[0]["match_worker_counts"], json!(""));
    assert_eq!(rows[0]["match_other_names"], json!("Alpha\nBeta"));
}

#[test]
fn doubly_nested_list_with_bad_element_is_a_schema_violation() {
    let raw = json!({
        "matches": [{
            "id": "A",
            "properties": { "extended_fields": { "name": [null] } }
        }],
        "status": "MATCHED"
    });
    assert!(matches!(
        flatten_facilities(&raw),
        Err(ClientError::SchemaViolation { .. })
    ));
}

#[test]
fn missing_matches_is_a_schema_violation() {
    assert!(matches!(
        flatten_facilities(&json!({ "status": "NEW_FACILITY" })),
        Err(ClientError::SchemaViolation { .. })
    ));
    assert!(matches!(
        flatten_facilities(&json!([])),
        Err(ClientError::SchemaViolation { .. })
    ));
}

#[test]
fn candidate_geometry_without_coordinates_is_a_schema_violation() {
    let raw = json!({
        "matches": [{ "id": "A", "geometry": { "type": "Point" } }],
        "status": "MATCHED"
    });
    assert!(matches!(
        flatten_facilities(&raw),
        Err(ClientError::SchemaViolation { .. })
    ));
}

const ADDRESS: &str = "Strasse 17, 12345 Beispiel";
const UPDATES: [&str; 4] = [
    "2022-10-05T12:43:37.488654Z",
    "2022-10-05T14:24:22.681351Z",
    "2022-10-05T14:25:36.697358Z",
    "2022-10-21T13:40:59.485894Z",
];

fn object(pairs: Vec<(&str, Value)>) -> Value {
    Value::Object(pairs.into_iter().map(|(k, v)| (k.to_owned(), v)).collect())
}

fn history_entry(value: &str, field: &str, updated_at: &str) -> Value {
    object(vec![
        ("value", json!(value)),
        ("field_name", json!(field)),
        ("contributor_id", json!(2757)),
        ("contributor_name", json!("Somebody")),
        ("updated_at", json!(updated_at)),
    ])
}

/// One candidate as the registry returned it for a matched submission.
fn matched_candidate() -> Value {
    let name_history: Vec<Value> = ["Somename", "Somename", "Hempelhuse", "Somename"]
        .into_iter()
        .zip(UPDATES)
        .map(|(name, at)| history_entry(name, "name", at))
        .collect();
    let address_history: Vec<Value> = UPDATES
        .into_iter()
        .map(|at| {
            let mut entry = history_entry(ADDRESS, "address", at);
            entry["is_from_claim"] = json!(false);
            entry
        })
        .collect();

    let extended_fields = object(vec![
        ("name", json!(name_history)),
        ("address", json!(address_history)),
        ("number_of_workers", json!([])),
        ("native_language_name", json!([])),
        ("facility_type", json!([])),
        ("processing_type", json!([])),
        ("product_type", json!([])),
        ("parent_company", json!([])),
    ]);

    let properties = object(vec![
        ("name", json!("Somename")),
        ("address", json!(ADDRESS)),
        ("country_code", json!("DE")),
        ("os_id", json!("DE2022278H70901")),
        ("other_names", json!(["Hempelhuse"])),
        ("other_addresses", json!([ADDRESS])),
        (
            "contributors",
            json!([{
                "id": 2757,
                "name": "Somebody",
                "is_verified": false,
                "contributor_name": "Somebody",
                "list_name": null
            }]),
        ),
        ("country_name", json!("Germany")),
        ("claim_info", Value::Null),
        (
            "other_locations",
            json!([{
                "lat": 48.383_352_7,
                "lng": 10.913_465,
                "contributor_id": 2757,
                "contributor_name": "Somebody",
                "notes": null
            }]),
        ),
        ("ppe_product_types", Value::Null),
        ("ppe_contact_phone", Value::Null),
        ("ppe_contact_email", Value::Null),
        ("ppe_website", Value::Null),
        ("is_closed", Value::Null),
        ("activity_reports", json!([])),
        ("contributor_fields", json!([])),
        ("new_os_id", Value::Null),
        ("has_inexact_coordinates", json!(false)),
        ("extended_fields", extended_fields),
        (
            "created_from",
            json!({
                "created_at": "2022-10-05T12:43:36.872785Z",
                "contributor": "Somebody"
            }),
        ),
        (
            "sector",
            json!([{
                "updated_at": "2022-10-21T13:40:59.485894Z",
                "contributor_id": 2757,
                "contributor_name": "Somebody",
                "values": ["Unspecified"],
                "is_from_claim": false
            }]),
        ),
    ]);

    object(vec![
        ("id", json!("DE2022278H70901")),
        ("type", json!("Feature")),
        (
            "geometry",
            json!({ "type": "Point", "coordinates": [10.913_448_2, 48.382_979_7] }),
        ),
        ("properties", properties),
    ])
}

fn matched_response() -> Value {
    let candidate = matched_candidate();
    object(vec![
        ("matches", json!([candidate.clone(), candidate])),
        ("item_id", json!(804_343)),
        (
            "geocoded_geometry",
            json!({ "type": "Point", "coordinates": [10.913_448_2, 48.382_979_7] }),
        ),
        (
            "geocoded_address",
            json!("Soldnerstra\u{df}e 17, 86167 Augsburg, Germany"),
        ),
        ("status", json!("MATCHED")),
        ("os_id", json!("DE2022278H70901")),
    ])
}

fn matched_row(match_no: u64) -> Value {
    object(vec![
        ("match_no", json!(match_no)),
        ("item_id", json!(804_343)),
        ("lon", json!(10.913_448_2)),
        ("lat", json!(48.382_979_7)),
        (
            "geocoded_address",
            json!("Soldnerstra\u{df}e 17, 86167 Augsburg, Germany"),
        ),
        ("status", json!("MATCHED")),
        ("os_id", json!("DE2022278H70901")),
        ("match_id", json!("DE2022278H70901")),
        ("match_lon", json!(10.913_448_2)),
        ("match_lat", json!(48.382_979_7)),
        ("match_name", json!("Somename")),
        ("match_address", json!(ADDRESS)),
        ("match_country_code", json!("DE")),
        ("match_os_id", json!("DE2022278H70901")),
        ("match_other_names", json!("Hempelhuse")),
        ("match_other_addresses", json!(ADDRESS)),
        (
            "match_contributors",
            json!(concat!(
                "id:2757|name:Somebody|is_verified:False|",
                "contributor_name:Somebody|list_name:None"
            )),
        ),
        ("match_country_name", json!("Germany")),
        ("match_claim_info", json!("")),
        (
            "match_other_locations",
            json!(concat!(
                "lat:48.3833527|lon:10.913465|contributor_id:2757|",
                "contributor_name:Somebody|notes:None"
            )),
        ),
        ("match_is_closed", json!("")),
        ("match_activity_reports", json!("")),
        ("match_contributor_fields", json!("")),
        ("match_new_os_id", json!("")),
        ("match_has_inexact_coordinates", json!(false)),
        (
            "match_ef_name",
            json!(concat!(
                "value:Somename|field_name:name|contributor_id:2757|",
                "contributor_name:Somebody|updated_at:2022-10-05T12:43:37.488654Z\n",
                "value:Somename|field_name:name|contributor_id:2757|",
                "contributor_name:Somebody|updated_at:2022-10-05T14:24:22.681351Z\n",
                "value:Hempelhuse|field_name:name|contributor_id:2757|",
                "contributor_name:Somebody|updated_at:2022-10-05T14:25:36.697358Z\n",
                "value:Somename|field_name:name|contributor_id:2757|",
                "contributor_name:Somebody|updated_at:2022-10-21T13:40:59.485894Z"
            )),
        ),
        (
            "match_ef_address",
            json!(concat!(
                "value:Strasse 17, 12345 Beispiel|field_name:address|contributor_id:2757|",
                "contributor_name:Somebody|updated_at:2022-10-05T12:43:37.488654Z|",
                "is_from_claim:False\n",
                "value:Strasse 17, 12345 Beispiel|field_name:address|contributor_id:2757|",
                "contributor_name:Somebody|updated_at:2022-10-05T14:24:22.681351Z|",
                "is_from_claim:False\n",
                "value:Strasse 17, 12345 Beispiel|field_name:address|contributor_id:2757|",
                "contributor_name:Somebody|updated_at:2022-10-05T14:25:36.697358Z|",
                "is_from_claim:False\n",
                "value:Strasse 17, 12345 Beispiel|field_name:address|contributor_id:2757|",
                "contributor_name:Somebody|updated_at:2022-10-21T13:40:59.485894Z|",
                "is_from_claim:False"
            )),
        ),
        ("match_ef_number_of_workers", json!("")),
        ("match_ef_native_language_name", json!("")),
        ("match_ef_facility_type", json!("")),
        ("match_ef_processing_type", json!("")),
        ("match_ef_product_type", json!("")),
        ("match_ef_parent_company", json!("")),
        (
            "match_created_from_created_at",
            json!("2022-10-05T12:43:36.872785Z"),
        ),
        ("match_created_from_contributor", json!("Somebody")),
        (
            "match_sector",
            json!(concat!(
                "updated_at:2022-10-21T13:40:59.485894Z|contributor_id:2757|",
                "contributor_name:Somebody|values:['Unspecified']|is_from_claim:False"
            )),
        ),
    ])
}

#[test]
fn matched_response_flattens_to_known_rows() {
    let rows = flatten_facilities(&matched_response()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(Value::Object(rows[0].clone()), matched_row(1));
    assert_eq!(Value::Object(rows[1].clone()), matched_row(2));

    let expected = matched_row(1);
    let expected_keys: Vec<&String> = expected.as_object().unwrap().keys().collect();
    let actual_keys: Vec<&String> = rows[0].keys().collect();
    assert_eq!(actual_keys, expected_keys);
}

#[test]
fn joined_values_use_python_spelling() {
    let raw = json!({
        "matches": [{
            "id": "A",
            "properties": {
                "contributors": [{
                    "is_verified": false,
                    "list_name": null,
                    "notes": "",
                    "values": ["Unspecified", "it's", 3, 0.5, null],
                    "meta": { "flag": true, "tags": [] }
                }]
            }
        }],
        "status": "MATCHED"
    });
    let rows = flatten_facilities(&raw).unwrap();
    assert_eq!(
        rows[0]["match_contributors"],
        json!(concat!(
            "is_verified:False|list_name:None|notes:|",
            "values:['Unspecified', \"it's\", 3, 0.5, None]|",
            "meta:{'flag': True, 'tags': []}"
        ))
    );
}

#[test]
fn python_quoting_escapes_delimiters() {
    assert_eq!(quote("plain"), "'plain'");
    assert_eq!(quote("it's"), "\"it's\"");
    assert_eq!(quote("both ' and \""), "'both \\' and \"'");
    assert_eq!(quote("a\\b\nc"), "'a\\\\b\\nc'");
}

#[test]
fn base_only_row_shortens_extended_field_keys() {
    let rows = flatten_facilities(&json!({
        "matches": [],
        "match_extended_fields_name": "X",
        "status": "NEW_FACILITY"
    }))
    .unwrap();
    assert_eq!(rows[0]["match_ef_name"], json!("X"));
    assert!(!rows[0].contains_key("match_extended_fields_name"));
}
