use keyshell::geom::{Point3, Tolerance, write_obj};
use keyshell::keyboard::{
    ColumnOffset, ConfigError, KeyboardConfig, KeyboardError, KeyboardLayout, SwitchKind,
    build_keyboard_mesh, column_key_transforms,
};

#[test]
fn default_keyboard_is_a_single_body() {
    let (model, diagnostics) = build_keyboard_mesh(KeyboardConfig::default()).expect("build");

    assert_eq!(model.stats.key_count, 18);
    assert_eq!(model.stats.intra_column_fillers, 12);
    assert_eq!(model.stats.inter_column_fillers, 25);
    assert_eq!(model.key_transforms.len(), 18);

    assert_eq!(diagnostics.component_count, 1, "{}", diagnostics.summary());
    assert!(diagnostics.is_valid_solid(), "{}", diagnostics.summary());
    assert!(model.solid.diagnostics().is_valid_solid());
    assert!(model.solid.signed_volume() > 0.0);
    assert!(!model.solid.has_invalid_vertices());
    assert_eq!(model.solid.validate(), Ok(()));
}

#[test]
fn small_mx_layout_is_a_single_body() {
    let config = KeyboardConfig {
        columns: 2,
        pinky_columns: 1,
        xz_offsets: vec![ColumnOffset::new(0.0, 6.0), ColumnOffset::new(-7.0, 0.0)],
        ..KeyboardConfig::default()
    }
    .with_switch(SwitchKind::Mx)
    .with_rows(2);

    let (model, diagnostics) = build_keyboard_mesh(config).expect("build");

    assert_eq!(model.stats.key_count, 4);
    assert_eq!(model.stats.intra_column_fillers, 2);
    assert_eq!(model.stats.inter_column_fillers, 3);
    assert!(diagnostics.is_single_body(), "{}", diagnostics.summary());
    assert!(diagnostics.is_valid_solid(), "{}", diagnostics.summary());
}

#[test]
fn keys_in_a_column_have_distinct_placements() {
    let layout = KeyboardLayout::new(KeyboardConfig::default()).expect("layout");
    let tol = Tolerance::new(1e-6);
    for column in 0..layout.columns() {
        let origins: Vec<Point3> = (0..3)
            .map(|row| {
                layout
                    .key_transform(row, column)
                    .expect("transform")
                    .apply_point(Point3::ORIGIN)
            })
            .collect();
        assert!(!tol.approx_eq_point3(origins[0], origins[1]));
        assert!(!tol.approx_eq_point3(origins[1], origins[2]));
        assert!(!tol.approx_eq_point3(origins[0], origins[2]));
    }
    assert_eq!(column_key_transforms(layout.column_curvature(0), 3).len(), 3);
}

#[test]
fn invalid_config_is_rejected_before_any_geometry() {
    let config = KeyboardConfig {
        row_angle_deg: 180.0,
        ..KeyboardConfig::default()
    };
    let err = build_keyboard_mesh(config).expect_err("degenerate row arc");
    assert_eq!(
        err,
        KeyboardError::Config(ConfigError::DegenerateCurvature {
            parameter: "row_angle_deg",
            angle_deg: 180.0,
        })
    );
    assert!(err.to_string().contains("row_angle_deg"));

    let config = KeyboardConfig {
        xz_offsets: vec![ColumnOffset::default(); 4],
        ..KeyboardConfig::default()
    };
    let err = build_keyboard_mesh(config).expect_err("offset mismatch");
    assert!(err.to_string().contains("xz_offsets"));
}

#[test]
fn config_from_json_builds_and_exports() {
    let json = r#"{
        "rows": 1,
        "columns": 2,
        "pinky_columns": 0,
        "row_angle_deg": 0.0,
        "xz_offsets": [{ "x": 0.0, "z": 0.0 }, { "x": 0.0, "z": 0.0 }],
        "final_tilt_deg": 0.0
    }"#;
    let config = KeyboardConfig::from_json_str(json).expect("parse");
    assert_eq!(config.switch, SwitchKind::Choc);

    let (model, diagnostics) = build_keyboard_mesh(config).expect("build");
    assert!(diagnostics.is_single_body(), "{}", diagnostics.summary());
    assert!(diagnostics.is_valid_solid(), "{}", diagnostics.summary());
    assert_eq!(model.stats.inter_column_fillers, 1);

    let mut obj = Vec::new();
    write_obj(&mut obj, &model.solid, "keyboard").expect("write obj");
    let text = String::from_utf8(obj).expect("utf8");
    let vertices = text.lines().filter(|l| l.starts_with("v ")).count();
    let faces = text.lines().filter(|l| l.starts_with("f ")).count();
    assert_eq!(vertices, model.solid.vertex_count());
    assert_eq!(faces, model.solid.triangle_count());
}
