// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Tests for field-name extraction and by-name projection.

#[cfg(test)]
mod tests {
    use crate::error::RowError;
    use crate::schema::{field_names, project};
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Article {
        id: u32,
        title: String,
        body: String,
        views: u64,
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct TitleViews {
        title: String,
        views: u64,
    }

    #[derive(Debug, Deserialize)]
    struct WithExtraField {
        id: u32,
        missing: String,
    }

    #[derive(Debug, Deserialize)]
    struct WrongType {
        // `title` is a string on Article.
        title: u64,
    }

    fn article() -> Article {
        Article {
            id: 3,
            title: "heap files".to_string(),
            body: "long text".to_string(),
            views: 9,
        }
    }

    #[test]
    fn test_field_names_in_declaration_order() {
        let names = field_names::<Article>().unwrap();
        assert_eq!(names, vec!["id", "title", "body", "views"]);
    }

    #[test]
    fn test_field_names_rejects_scalar() {
        let result = field_names::<u32>();
        assert!(matches!(result, Err(RowError::NotAStruct { .. })));
    }

    #[test]
    fn test_field_names_rejects_sequence() {
        let result = field_names::<Vec<String>>();
        assert!(matches!(result, Err(RowError::NotAStruct { .. })));
    }

    #[test]
    fn test_field_names_rejects_map() {
        let result = field_names::<HashMap<String, u32>>();
        assert!(matches!(result, Err(RowError::NotAStruct { .. })));
    }

    #[test]
    fn test_project_narrows_by_name() {
        let narrow: TitleViews = project(&article()).unwrap();
        assert_eq!(
            narrow,
            TitleViews {
                title: "heap files".to_string(),
                views: 9,
            }
        );
    }

    #[test]
    fn test_project_identity() {
        let full: Article = project(&article()).unwrap();
        assert_eq!(full, article());
    }

    #[test]
    fn test_project_unknown_field() {
        let result: Result<WithExtraField, _> = project(&article());
        match result {
            Err(RowError::UnknownField { field }) => assert_eq!(field, "missing"),
            other => panic!("expected UnknownField, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_project_type_mismatch() {
        let result: Result<WrongType, _> = project(&article());
        assert!(matches!(result, Err(RowError::ProjectionMismatch { .. })));
    }

    #[test]
    fn test_project_rejects_non_struct_source() {
        let result: Result<TitleViews, _> = project(&41u32);
        assert!(matches!(result, Err(RowError::NotAStruct { .. })));
    }
}
