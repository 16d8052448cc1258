#[cfg(test)]
mod tests {
    use crate::context::{ContextSchema, ContextVariable};
    use crate::project::ProjectLayout;
    use crate::template::{Endpoint, TemplateDocument};
    use indexmap::IndexMap;
    use serde_json::json;
    use std::path::Path;

    fn document(value: serde_json::Value) -> TemplateDocument {
        TemplateDocument::from_value(value).unwrap()
    }

    fn section(doc: &TemplateDocument, key: &str) -> Option<serde_json::Value> {
        doc.clone().into_value().get(key).cloned()
    }

    #[test]
    fn test_non_object_template_is_rejected() {
        let err = TemplateDocument::from_value(json!([1, 2])).unwrap_err();
        assert_eq!(err.code(), "SGT-ERR-TEMPLATE");
    }

    #[test]
    fn test_missing_sections_are_materialized() {
        let mut doc = document(json!({ "name": "mySgt" }));
        doc.materialize_sections().unwrap();
        assert_eq!(
            doc.into_value(),
            json!({ "name": "mySgt", "connection": {}, "contextDefinition": {} })
        );
    }

    #[test]
    fn test_non_object_section_is_rejected() {
        let mut doc = document(json!({ "connection": "http://x" }));
        assert!(doc.materialize_sections().is_err());
    }

    #[test]
    fn test_set_transform_replaces_previous() {
        let mut doc = document(json!({ "transform": { "default": "old", "stale": true } }));
        let mut handlers = IndexMap::new();
        handlers.insert("404".to_string(), "return []".to_string());
        doc.set_transform(Some("return 1".to_string()), &handlers);
        assert_eq!(
            section(&doc, "transform"),
            Some(json!({ "default": "return 1", "errorHandlers": { "404": "return []" } }))
        );

        doc.set_transform(None, &IndexMap::new());
        assert_eq!(section(&doc, "transform"), Some(json!({ "errorHandlers": {} })));
    }

    #[test]
    fn test_bulk_flag_set_and_removed() {
        let mut doc = document(json!({ "connection": { "method": "GET", "bulk": true, "timeout": 5 } }));
        doc.set_bulk(Some(false)).unwrap();
        assert_eq!(section(&doc, "connection").unwrap()["bulk"], json!(false));

        doc.set_bulk(None).unwrap();
        let text = doc.to_pretty_string().unwrap();
        assert_eq!(
            text,
            "{\n  \"connection\": {\n    \"method\": \"GET\",\n    \"timeout\": 5\n  }\n}\n"
        );
    }

    #[test]
    fn test_patch_connection_keeps_other_fields() {
        let mut doc = document(json!({
            "connection": { "method": "GET", "toUrl": "return 'x'", "headers": { "A": "1" }, "bulk": true }
        }));
        doc.patch_connection(Endpoint::Url("http://example.com".to_string()), None)
            .unwrap();
        assert_eq!(
            section(&doc, "connection"),
            Some(json!({
                "method": "GET", "headers": { "A": "1" }, "bulk": true, "url": "http://example.com"
            }))
        );

        doc.patch_connection(
            Endpoint::ToUrl("return ctx.u".to_string()),
            Some(json!({ "B": "2" })),
        )
        .unwrap();
        let connection = section(&doc, "connection").unwrap();
        assert!(connection.get("url").is_none());
        assert_eq!(connection["toUrl"], json!("return ctx.u"));
        assert_eq!(connection["headers"], json!({ "B": "2" }));
        assert_eq!(connection["method"], json!("GET"));
    }

    #[test]
    fn test_merge_overwrites_group_keys_only() {
        let mut doc = document(json!({
            "contextDefinition": {
                "window": { "description": "old" },
                "other": { "description": "untouched" }
            }
        }));
        let mut schema = ContextSchema::new();
        schema.insert("window", ContextVariable::new("new"));
        schema.insert("host", ContextVariable::new("Host"));
        doc.merge_context_definition(&schema).unwrap();
        assert_eq!(
            section(&doc, "contextDefinition"),
            Some(json!({
                "window": { "description": "new" },
                "other": { "description": "untouched" },
                "host": { "description": "Host" }
            }))
        );
    }

    #[test]
    fn test_layout_paths() {
        let project = ProjectLayout::new("/work/mySgt").unwrap();
        assert_eq!(project.name(), "mySgt");
        assert_eq!(project.template_path(), Path::new("/work/mySgt/mySgt.json"));
        assert_eq!(
            project.transform_path(),
            Path::new("/work/mySgt/transform/transform.js")
        );
        assert_eq!(
            project.connection_path(),
            Path::new("/work/mySgt/connection/connection.js")
        );
    }

    #[test]
    fn test_layout_names_current_dir_after_real_path() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("fromDot");
        std::fs::create_dir_all(dir.join("child")).unwrap();
        let project = ProjectLayout::new(dir.join("child").join("..")).unwrap();
        assert_eq!(project.name(), "fromDot");
    }
}
