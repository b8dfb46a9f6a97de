//! Validates the viewer's WGSL with naga so shader breakage shows up without a GPU.

const SHADER: &str = include_str!("../src/shader.wgsl");

fn validate_wgsl(code: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(code)
        .map_err(|e| format!("WGSL parse error: {:?}", e))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("WGSL validation error: {:?}", e))?;

    Ok(module)
}

#[test]
fn test_instanced_shader_validates() {
    if let Err(e) = validate_wgsl(SHADER) {
        panic!("{}", e);
    }
}

#[test]
fn test_shader_has_both_entry_points() {
    let module = validate_wgsl(SHADER).unwrap();
    let names: Vec<&str> = module
        .entry_points
        .iter()
        .map(|ep| ep.name.as_str())
        .collect();
    assert!(names.contains(&"vs_main"));
    assert!(names.contains(&"fs_main"));
}
