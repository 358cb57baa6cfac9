// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end tests for the table engine.
//!
//! Exercises CRUD, ordered scans, hole reuse, index persistence across
//! reopen, compaction reclamation and the read-only contract against real
//! files in temp directories.

#[cfg(test)]
mod tests {
    use crate::error::RowError;
    use crate::heap::{self, DataRow};
    use crate::table::types::OpenOptions;
    use crate::table::Table;
    use serde::{Deserialize, Serialize};
    use std::cmp::Ordering;
    use std::path::Path;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        id: u32,
        name: String,
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct IdOnly {
        id: u32,
    }

    fn cmp_u32(a: &u32, b: &u32) -> Ordering {
        a.cmp(b)
    }

    fn payload(id: u32, name: &str) -> Payload {
        Payload {
            id,
            name: name.to_string(),
        }
    }

    fn open(base: &Path) -> Table<u32, Payload> {
        Table::open(base, cmp_u32, OpenOptions::default()).unwrap()
    }

    /// Deterministic permutation of 1..=n.
    fn shuffled(n: u32) -> Vec<u32> {
        let mut keys: Vec<u32> = (1..=n).collect();
        let mut state: u64 = 0x1234_5678;
        for i in (1..keys.len()).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let j = (state >> 33) as usize % (i + 1);
            keys.swap(i, j);
        }
        keys
    }

    #[test]
    fn test_columns_derived_from_payload() {
        let dir = tempdir().unwrap();
        let table = open(&dir.path().join("t"));
        assert_eq!(table.columns(), &["id".to_string(), "name".to_string()]);
    }

    #[test]
    fn test_insert_search_get_all() {
        let dir = tempdir().unwrap();
        let mut table = open(&dir.path().join("t"));
        for (k, name) in [(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
            table.insert(k, payload(k, name)).unwrap();
        }

        let row = table.search(&3).unwrap();
        assert_eq!(row.data, payload(3, "c"));
        assert!(row.is_valid);

        let keys: Vec<u32> = table
            .get_all()
            .map(|r| r.unwrap().primary_key)
            .collect();
        assert_eq!(keys, vec![1, 2, 3, 4]);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_search_missing_key() {
        let dir = tempdir().unwrap();
        let table = open(&dir.path().join("t"));
        assert!(matches!(table.search(&1), Err(RowError::KeyNotFound)));
    }

    #[test]
    fn test_filter_and_projection_over_hundred_rows() {
        let dir = tempdir().unwrap();
        let mut table = open(&dir.path().join("t"));
        for k in shuffled(100) {
            table.insert(k, payload(k, "row")).unwrap();
        }

        let keys = table.keys_where(|row| row.data.id > 3).unwrap();
        assert_eq!(keys.len(), 97);

        let ids: Vec<u32> = table
            .select::<IdOnly>(keys)
            .map(|r| r.unwrap().id)
            .collect();
        assert_eq!(ids.len(), 97);
        assert_eq!(ids.iter().map(|&i| u64::from(i)).sum::<u64>(), 5044);
    }

    #[test]
    fn test_delete_removes_key_and_records_hole() {
        let dir = tempdir().unwrap();
        let mut table = open(&dir.path().join("t"));
        for (k, name) in [(1, "a"), (2, "b"), (3, "c")] {
            table.insert(k, payload(k, name)).unwrap();
        }

        let deleted = table.delete(&2).unwrap();
        assert!(!deleted.is_valid);
        assert_eq!(deleted.data, payload(2, "b"));

        assert!(matches!(table.search(&2), Err(RowError::KeyNotFound)));
        let keys: Vec<u32> = table.get_all().map(|r| r.unwrap().primary_key).collect();
        assert_eq!(keys, vec![1, 3]);

        let expected_size =
            heap::encoded_size(&DataRow::new(2u32, payload(2, "b"))).unwrap();
        assert_eq!(table.free_nodes().len(), 1);
        assert_eq!(table.free_nodes()[0].size, expected_size);
    }

    #[test]
    fn test_delete_missing_key() {
        let dir = tempdir().unwrap();
        let mut table = open(&dir.path().join("t"));
        assert!(matches!(table.delete(&7), Err(RowError::KeyNotFound)));
    }

    #[test]
    fn test_exact_fit_hole_is_reused() {
        let dir = tempdir().unwrap();
        let mut table = open(&dir.path().join("t"));
        table.insert(1, payload(1, "aaaa")).unwrap();
        table.insert(2, payload(2, "bbbb")).unwrap();
        let len_before = table.heap_len().unwrap();

        table.delete(&1).unwrap();
        // Same encoded size: the hole is taken and the file does not grow.
        table.insert(3, payload(3, "cccc")).unwrap();
        assert_eq!(table.heap_len().unwrap(), len_before);
        assert!(table.free_nodes().is_empty());
        assert_eq!(table.search(&3).unwrap().data, payload(3, "cccc"));
        assert_eq!(table.search(&2).unwrap().data, payload(2, "bbbb"));
    }

    #[test]
    fn test_oversized_hole_is_split() {
        let dir = tempdir().unwrap();
        let mut table = open(&dir.path().join("t"));
        table.insert(1, payload(1, "aaaaaa")).unwrap();
        table.insert(4, payload(4, &"a".repeat(200))).unwrap();

        table.delete(&4).unwrap();
        let hole = table.free_nodes()[0];

        table.insert(4, payload(4, "short")).unwrap();
        let small_size = heap::encoded_size(&DataRow::new(4u32, payload(4, "short"))).unwrap();

        // Remainder hole sits directly behind the reused prefix.
        assert_eq!(table.free_nodes().len(), 1);
        assert_eq!(table.free_nodes()[0].offset, hole.offset + small_size);
        assert_eq!(table.free_nodes()[0].size, hole.size - small_size);

        // Both live rows decode cleanly; nothing overlaps.
        assert_eq!(table.search(&1).unwrap().data, payload(1, "aaaaaa"));
        assert_eq!(table.search(&4).unwrap().data, payload(4, "short"));

        table.compact().unwrap();
        let rows: Vec<DataRow<u32, Payload>> =
            table.get_all().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].data, payload(1, "aaaaaa"));
        assert_eq!(rows[1].data, payload(4, "short"));
    }

    #[test]
    fn test_update_with_data() {
        let dir = tempdir().unwrap();
        let mut table = open(&dir.path().join("t"));
        table.insert(1, payload(1, "old")).unwrap();
        table.update_with_data(1, payload(1, "new")).unwrap();
        assert_eq!(table.search(&1).unwrap().data, payload(1, "new"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_update_with_func_doubles_payload() {
        let dir = tempdir().unwrap();
        let mut table = open(&dir.path().join("t"));
        for k in 1..=4 {
            table.insert(k, payload(k, "n")).unwrap();
        }
        for k in 1..=4 {
            table
                .update_with_func(k, |mut data| {
                    data.id *= 2;
                    data
                })
                .unwrap();
        }
        for k in 1..=4u32 {
            assert_eq!(table.search(&k).unwrap().data.id, k * 2);
        }
    }

    #[test]
    fn test_update_missing_key() {
        let dir = tempdir().unwrap();
        let mut table = open(&dir.path().join("t"));
        let result = table.update_with_data(9, payload(9, "x"));
        assert!(matches!(result, Err(RowError::KeyNotFound)));
    }

    #[test]
    fn test_compact_reclaims_tombstones() {
        let dir = tempdir().unwrap();
        let mut table = open(&dir.path().join("t"));
        for (k, name) in [(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
            table.insert(k, payload(k, name)).unwrap();
        }
        table.delete(&3).unwrap();
        table.insert(3, payload(3, "c2")).unwrap();
        assert_eq!(table.search(&3).unwrap().data, payload(3, "c2"));

        table.compact().unwrap();

        let expected: u64 = [
            heap::encoded_size(&DataRow::new(1u32, payload(1, "a"))).unwrap(),
            heap::encoded_size(&DataRow::new(2u32, payload(2, "b"))).unwrap(),
            heap::encoded_size(&DataRow::new(3u32, payload(3, "c2"))).unwrap(),
            heap::encoded_size(&DataRow::new(4u32, payload(4, "d"))).unwrap(),
        ]
        .iter()
        .sum();
        assert_eq!(table.heap_len().unwrap(), expected);
        assert!(table.free_nodes().is_empty());
        let free_path = dir.path().join("t_free.bin");
        assert_eq!(std::fs::metadata(free_path).unwrap().len(), 0);

        let keys: Vec<u32> = table.get_all().map(|r| r.unwrap().primary_key).collect();
        assert_eq!(keys, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_compact_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut table = open(&dir.path().join("t"));
        for k in shuffled(30) {
            table.insert(k, payload(k, "payload")).unwrap();
        }
        for k in [5u32, 10, 15, 20] {
            table.delete(&k).unwrap();
        }

        table.compact().unwrap();
        let len_first = table.heap_len().unwrap();
        let rows_first: Vec<(u32, Payload)> = table
            .get_all()
            .map(|r| r.unwrap())
            .map(|r| (r.primary_key, r.data))
            .collect();

        table.compact().unwrap();
        assert_eq!(table.heap_len().unwrap(), len_first);
        let rows_second: Vec<(u32, Payload)> = table
            .get_all()
            .map(|r| r.unwrap())
            .map(|r| (r.primary_key, r.data))
            .collect();
        assert_eq!(rows_first, rows_second);
    }

    #[test]
    fn test_index_survives_reopen() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("t");
        {
            let mut table = open(&base);
            for k in 1..=10 {
                table.insert(k, payload(k, "persisted")).unwrap();
            }
            table.save_index().unwrap();
        }

        let mut table = open(&base);
        assert!(table.is_empty());
        table.load_index().unwrap();
        assert_eq!(table.len(), 10);
        for k in 1..=10u32 {
            let row = table.search(&k).unwrap();
            assert_eq!(row.data, payload(k, "persisted"));
        }
    }

    #[test]
    fn test_overwrite_discards_previous_table() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("t");
        {
            let mut table = open(&base);
            table.insert(1, payload(1, "gone")).unwrap();
            table.save_index().unwrap();
        }
        let table: Table<u32, Payload> = Table::open(
            &base,
            cmp_u32,
            OpenOptions {
                overwrite: true,
                ..OpenOptions::default()
            },
        )
        .unwrap();
        assert_eq!(table.heap_len().unwrap(), 0);
        assert!(!dir.path().join("t_index.bin").exists());
    }

    #[test]
    fn test_second_open_of_same_base_fails() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("t");
        let _held = open(&base);
        let result: Result<Table<u32, Payload>, _> =
            Table::open(&base, cmp_u32, OpenOptions::default());
        assert!(matches!(result, Err(RowError::TableLocked { .. })));
    }

    #[test]
    fn test_read_only_table_rejects_writes() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("t");
        {
            let mut table = open(&base);
            table.insert(1, payload(1, "kept")).unwrap();
            table.save_index().unwrap();
        }

        let mut table: Table<u32, Payload> = Table::open(
            &base,
            cmp_u32,
            OpenOptions {
                read_only: true,
                ..OpenOptions::default()
            },
        )
        .unwrap();
        table.load_index().unwrap();

        assert_eq!(table.search(&1).unwrap().data, payload(1, "kept"));
        assert!(matches!(
            table.insert(2, payload(2, "no")),
            Err(RowError::ReadOnlyTable { .. })
        ));
        assert!(matches!(table.delete(&1), Err(RowError::ReadOnlyTable { .. })));
        assert!(matches!(table.compact(), Err(RowError::ReadOnlyTable { .. })));
        assert!(matches!(
            table.save_index(),
            Err(RowError::ReadOnlyTable { .. })
        ));
    }

    #[test]
    fn test_open_rejects_non_struct_payload() {
        let dir = tempdir().unwrap();
        let result: Result<Table<u32, u64>, _> = Table::open(
            dir.path().join("t"),
            cmp_u32,
            OpenOptions::default(),
        );
        assert!(matches!(result, Err(RowError::NotAStruct { .. })));
    }

    #[test]
    fn test_open_rejects_degree_below_minimum() {
        let dir = tempdir().unwrap();
        let result: Result<Table<u32, Payload>, _> = Table::open(
            dir.path().join("t"),
            cmp_u32,
            OpenOptions {
                degree: 1,
                ..OpenOptions::default()
            },
        );
        assert!(matches!(result, Err(RowError::InvalidDegree { .. })));
    }

    #[test]
    fn test_mixed_workload_keeps_index_heap_consistent() {
        let dir = tempdir().unwrap();
        let mut table = open(&dir.path().join("t"));
        let keys = shuffled(120);

        for &k in &keys {
            table.insert(k, payload(k, "v1")).unwrap();
        }
        for (i, &k) in keys.iter().enumerate() {
            match i % 3 {
                0 => {
                    table.delete(&k).unwrap();
                }
                1 => {
                    table.update_with_data(k, payload(k, "v2")).unwrap();
                }
                _ => {}
            }
        }

        // Every reachable row decodes, is live, and matches its key.
        let mut live = 0;
        for row in table.get_all() {
            let row = row.unwrap();
            assert!(row.is_valid);
            assert_eq!(row.data.id, row.primary_key);
            live += 1;
        }
        assert_eq!(live, table.len());

        // Free-list entries are sorted by size and lie within the heap.
        let heap_len = table.heap_len().unwrap();
        let nodes = table.free_nodes();
        for pair in nodes.windows(2) {
            assert!(pair[0].size <= pair[1].size);
        }
        for node in nodes {
            assert!(node.offset + node.size <= heap_len);
        }

        table.compact().unwrap();
        assert!(table.free_nodes().is_empty());
        assert_eq!(
            table.get_all().map(|r| r.unwrap()).count(),
            table.len()
        );
    }

    #[test]
    fn test_stats_count_operations() {
        let dir = tempdir().unwrap();
        let mut table = open(&dir.path().join("t"));
        table.insert(1, payload(1, "a")).unwrap();
        table.insert(2, payload(2, "b")).unwrap();
        table.delete(&1).unwrap();
        table.update_with_data(2, payload(2, "b2")).unwrap();
        table.compact().unwrap();

        let stats = table.stats();
        assert_eq!(stats.inserts, 3); // 2 inserts + 1 via update
        assert_eq!(stats.deletes, 2); // 1 delete + 1 via update
        assert_eq!(stats.updates, 1);
        assert_eq!(stats.compactions, 1);
    }
}
