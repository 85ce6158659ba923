use mandelmin_core::{ConfigError, RenderParameters};

#[test]
fn loads_parameters_from_file() {
    let path = std::env::temp_dir().join(format!("mandelmin-{}-params.json", std::process::id()));
    std::fs::write(
        &path,
        r#"{ "center": [-0.75, 0.1], "magnification": 0.5, "width": 320, "height": 200, "iterations": 500 }"#,
    )
    .unwrap();

    let params = RenderParameters::from_json_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(params.center, (-0.75, 0.1));
    assert_eq!(params.magnification, 0.5);
    assert_eq!((params.width, params.height), (320, 200));
    assert_eq!(params.iterations, 500);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = RenderParameters::from_json_file("/nonexistent/mandelmin/params.json").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("/nonexistent/mandelmin/params.json"));
}

#[test]
fn invalid_values_in_file_are_rejected() {
    let err = RenderParameters::from_json_str(r#"{ "width": 0 }"#).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidParameter { .. }));
}
