// Integration tests for the single_diffexpr crate
// End-to-end flows across loading, computing, ranking and exporting.

#[cfg(test)]
mod integration_tests {
    use std::io::Write;

    use approx::assert_abs_diff_eq;
    use nalgebra_sparse::{CooMatrix, CsrMatrix};
    use single_diffexpr::data::NumericMatrixSource;
    use single_diffexpr::io::{load_average_expression, save_result_csv};
    use single_diffexpr::progress::{NoProgress, ProgressCounter};
    use single_diffexpr::statistics::range::{MAX_PROPERTY, MIN_PROPERTY};
    use single_diffexpr::{
        AggregationMode, Cluster, ClusterAssignment, ComputeState, DenseDataset, DiffExprConfig,
        DiffExprError, DiffExprSession, PersistedState, Selection, SparseDataset,
    };

    fn genes(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn scenario_dataset() -> DenseDataset<f64> {
        DenseDataset::from_rows(
            vec![
                vec![0.0, 10.0],
                vec![2.0, 20.0],
                vec![4.0, 30.0],
                vec![6.0, 40.0],
            ],
            genes(&["g0", "g1"]),
        )
        .unwrap()
    }

    #[test]
    fn test_bulk_session_and_export() {
        let mut dataset = scenario_dataset();
        let mut session = DiffExprSession::new(&DiffExprConfig::default());
        session.set_selection_a(Selection::new(vec![0, 1]));
        session.set_selection_b(Selection::new(vec![2, 3]));

        let progress = ProgressCounter::new();
        let table = session
            .compute(&mut dataset, AggregationMode::Bulk, &progress)
            .unwrap();
        assert!(progress.is_finished());
        assert_eq!(session.state(), ComputeState::UpToDate);

        let g1 = table.find("g1").unwrap();
        assert_eq!((g1.mean_a, g1.mean_b), (15.0, 35.0));
        assert_eq!((g1.median_a, g1.median_b), (Some(20.0), Some(40.0)));
        assert_eq!(g1.difference, 20.0);
        assert_eq!(table.top(1)[0].dimension_name, "g1");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.csv");
        save_result_csv(&table, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID,Difference,Mean (A),Mean (B),Median (A),Median (B)");
        assert_eq!(lines[1], "g0,4,1,5,2,6");
        assert_eq!(lines[2], "g1,20,15,35,20,40");
    }

    #[test]
    fn test_empty_selection_keeps_previous_table() {
        let mut dataset = scenario_dataset();
        let mut session = DiffExprSession::default();
        session.set_selection_a(Selection::new(vec![0, 1]));
        session.set_selection_b(Selection::new(vec![2, 3]));
        let first = session
            .compute(&mut dataset, AggregationMode::Bulk, &NoProgress)
            .unwrap();

        session.set_selection_b(Selection::default());
        let refused = session.compute(&mut dataset, AggregationMode::Bulk, &NoProgress);

        assert!(matches!(refused, Err(DiffExprError::EmptySelection { ref name }) if name == "B"));
        assert_eq!(*session.result().unwrap(), *first);
        assert_eq!(session.state(), ComputeState::OutDated);
    }

    #[test]
    fn test_normalization_from_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"decimals": 2, "normalize": true}"#).unwrap();
        let config = DiffExprConfig::from_json_file(file.path()).unwrap();

        let mut dataset = scenario_dataset();
        let mut session = DiffExprSession::new(&config);
        session.set_selection_a(Selection::new(vec![0, 1]));
        session.set_selection_b(Selection::new(vec![2, 3]));
        let table = session
            .compute(&mut dataset, AggregationMode::Bulk, &NoProgress)
            .unwrap();

        let g0 = table.find("g0").unwrap();
        assert_abs_diff_eq!(g0.mean_a, 1.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g0.mean_b, 5.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g0.median_b.unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(g0.difference, 0.67);

        assert_eq!(dataset.properties().get_floats(MIN_PROPERTY), Some(&[0.0, 10.0][..]));
        assert_eq!(dataset.properties().get_floats(MAX_PROPERTY), Some(&[6.0, 40.0][..]));
    }

    #[test]
    fn test_sparse_dataset_with_implicit_zeros() {
        // 4 x 2, column 0 has a single stored value
        let coo = CooMatrix::try_from_triplets(
            4,
            2,
            vec![1, 0, 1, 2, 3],
            vec![0, 1, 1, 1, 1],
            vec![8.0, 1.0, 3.0, 5.0, 7.0],
        )
        .unwrap();
        let mut dataset = SparseDataset::new(CsrMatrix::from(&coo), genes(&["a", "b"])).unwrap();

        let mut session = DiffExprSession::default();
        session.set_selection_a(Selection::new(vec![0, 1, 2]));
        session.set_selection_b(Selection::new(vec![3]));
        let table = session
            .compute(&mut dataset, AggregationMode::Bulk, &NoProgress)
            .unwrap();

        let a = table.find("a").unwrap();
        assert_abs_diff_eq!(a.mean_a, 8.0 / 3.0, epsilon = 1e-12);
        assert_eq!(a.median_a, Some(0.0));
        assert_eq!(a.mean_b, 0.0);

        let b = table.find("b").unwrap();
        assert_eq!((b.mean_a, b.mean_b), (3.0, 7.0));
        assert_eq!(b.median_a, Some(3.0));
        assert_eq!(b.difference, 4.0);
    }

    #[test]
    fn test_single_cell_from_loaded_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b",g1,g2\nT,2,10\nB,4,0\nNK,8,8\n").unwrap();
        let (mut expression, report) = load_average_expression(file.path()).unwrap();
        assert!(report.is_clean());

        let clusters = vec![
            Cluster::new("T", vec![0, 1, 2]),
            Cluster::new("B", vec![3, 4]),
            Cluster::new("NK", vec![5]),
            Cluster::new("Mono", vec![6]),
        ];
        let assignment = ClusterAssignment::from_clusters(&clusters, 7).unwrap();
        let mut cells = DenseDataset::from_rows(vec![vec![0.0; 2]; 7], genes(&["g1", "g2"])).unwrap();

        let mut session = DiffExprSession::default();
        session.set_selection_a(Selection::new(vec![0, 1, 3]));
        session.set_selection_b(Selection::new(vec![5, 6]));
        let table = session
            .compute(
                &mut cells,
                AggregationMode::SingleCell {
                    expression: &mut expression,
                    assignment: &assignment,
                },
                &NoProgress,
            )
            .unwrap();

        let g1 = table.find("g1").unwrap();
        assert_abs_diff_eq!(g1.mean_a, 8.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g1.mean_b, 8.0, epsilon = 1e-12);
        assert_eq!(g1.difference, 5.333);
        assert_eq!(g1.median_a, None);

        let g2 = table.find("g2").unwrap();
        assert_abs_diff_eq!(g2.mean_a, 20.0 / 3.0, epsilon = 1e-12);
        assert_eq!(g2.difference, 1.333);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single_cell.csv");
        save_result_csv(&table, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("g1,5.333,"));
        assert!(text.lines().skip(1).all(|line| line.ends_with(",N/A,N/A")));
    }

    #[test]
    fn test_single_cell_with_table_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let table_path = dir.path().join("avg_expr.csv");
        std::fs::write(&table_path, ",g1\nT,3\nB,9\n").unwrap();
        let config_path = dir.path().join("config.json");
        let config_json = serde_json::json!({ "average_expression_path": table_path });
        std::fs::write(&config_path, config_json.to_string()).unwrap();

        let config = DiffExprConfig::from_json_file(&config_path).unwrap();
        let (mut expression, report) = config.load_average_expression().unwrap().unwrap();
        assert!(report.is_clean());

        let clusters = vec![Cluster::new("T", vec![0, 1]), Cluster::new("B", vec![2])];
        let assignment = ClusterAssignment::from_clusters(&clusters, 3).unwrap();
        let mut cells = DenseDataset::from_rows(vec![vec![0.0]; 3], genes(&["g1"])).unwrap();

        let mut session = DiffExprSession::new(&config);
        session.set_selection_a(Selection::new(vec![0, 1]));
        session.set_selection_b(Selection::new(vec![2]));
        let table = session
            .compute(
                &mut cells,
                AggregationMode::SingleCell {
                    expression: &mut expression,
                    assignment: &assignment,
                },
                &NoProgress,
            )
            .unwrap();

        let g1 = table.find("g1").unwrap();
        assert_eq!((g1.mean_a, g1.mean_b), (3.0, 9.0));
        assert_eq!(g1.difference, 6.0);
        assert!(table.exclusions_a().is_empty());
    }

    #[test]
    fn test_single_cell_without_matching_clusters() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b",g1\nT,1\n").unwrap();
        let (mut expression, _) = load_average_expression(file.path()).unwrap();

        let clusters = vec![Cluster::new("T", vec![0]), Cluster::new("B", vec![1])];
        let assignment = ClusterAssignment::from_clusters(&clusters, 2).unwrap();
        let mut cells = DenseDataset::from_rows(vec![vec![0.0]; 2], genes(&["g1"])).unwrap();

        let mut session = DiffExprSession::default();
        session.set_selection_a(Selection::new(vec![0]));
        session.set_selection_b(Selection::new(vec![1]));
        let outcome = session.compute(
            &mut cells,
            AggregationMode::SingleCell {
                expression: &mut expression,
                assignment: &assignment,
            },
            &NoProgress,
        );

        assert!(matches!(outcome, Err(DiffExprError::NoMatchingClusters { ref name }) if name == "B"));
        assert_eq!(session.state(), ComputeState::Error);
        assert!(session.result().is_none());
    }

    #[test]
    fn test_persisted_state_round_trip() {
        let mut session = DiffExprSession::default();
        session.set_selection_a(Selection::new(vec![3, 1]));
        session.set_selection_b(Selection::new(vec![0]));
        session.set_normalize(true);

        let json = session.to_state().to_json().unwrap();
        let state = PersistedState::from_json(&json).unwrap();
        let restored = DiffExprSession::from_state(state, &DiffExprConfig::default());

        assert_eq!(restored.to_state(), session.to_state());

        let mut dataset = scenario_dataset();
        let mut restored = restored;
        let table = restored
            .compute(&mut dataset, AggregationMode::Bulk, &NoProgress)
            .unwrap();
        assert_abs_diff_eq!(table.find("g0").unwrap().mean_a, 4.0 / 6.0, epsilon = 1e-12);
    }
}
