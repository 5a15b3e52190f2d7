//! Round-trip tests for material persistence against on-disk shader
//! sources.

use std::path::PathBuf;
use std::sync::Arc;

use silene_core::paths::AssetPaths;
use silene_graphics::codec::{decode_utf16_le, encode_utf16_le};
use silene_graphics::{
    DecodeError, DecodeMode, Material, RenderDevice, RenderError, ShaderProgram, ShaderStage,
};

const BASIC_VERT: &str = "\
#version 330 core
layout (location = 0) in vec3 aPosition;

uniform mat4 u_MVP;
uniform vec3 u_Position;

void main()
{
    gl_Position = u_MVP * vec4(aPosition + u_Position, 1.0);
}
";

const BASIC_FRAG: &str = "\
#version 330 core
out vec4 FragColor;

uniform vec4 u_Color;
uniform float u_Test;

void main()
{
    FragColor = u_Color;
}
";

/// Create an assets tree holding the basic shader pair and return its
/// configuration.
fn test_paths(case: &str) -> AssetPaths {
    let root: PathBuf = std::env::temp_dir()
        .join("silene-material-roundtrip")
        .join(format!("{case}-{}", std::process::id()));
    let paths = AssetPaths::new(&root);
    std::fs::create_dir_all(paths.shaders()).unwrap();
    std::fs::write(paths.shader_file("basic.vert"), BASIC_VERT).unwrap();
    std::fs::write(paths.shader_file("basic.frag"), BASIC_FRAG).unwrap();
    paths
}

fn basic_material(device: &Arc<RenderDevice>, paths: &AssetPaths) -> Material {
    let mut program = ShaderProgram::new(device);
    program.open("basic.vert", ShaderStage::Vertex, paths).unwrap();
    program.open("basic.frag", ShaderStage::Fragment, paths).unwrap();
    program.compile().unwrap();
    Material::with_program(device, Arc::new(program))
}

#[test]
fn encode_then_decode_restores_program_and_uniform_names() {
    let paths = test_paths("basic");
    let device = RenderDevice::headless();

    let mut material = basic_material(&device, &paths);
    material.declare_uniform("u_Color").unwrap();

    let bytes = material.to_bytes(false);

    let mut restored = Material::new(&device).unwrap();
    restored.set_from_bytes(&bytes, &paths).unwrap();

    let program = restored.program();
    assert!(program.is_compiled());
    assert_eq!(program.stage_name(ShaderStage::Vertex), Some("basic.vert"));
    assert_eq!(program.stage_name(ShaderStage::Fragment), Some("basic.frag"));

    let uniforms = restored.uniforms();
    assert!(uniforms.contains("u_Color"));
    assert!(uniforms.contains("u_MVP"));
    assert!(uniforms.contains("u_Position"));
    assert!(uniforms.is_locked());
}

#[test]
fn declared_extras_survive_alongside_the_common_names() {
    let paths = test_paths("extras");
    let device = RenderDevice::headless();

    let mut material = basic_material(&device, &paths);
    material.declare_uniform("u_Test").unwrap();

    let bytes = material.to_bytes(false);

    let mut restored = Material::new(&device).unwrap();
    restored.set_from_bytes(&bytes, &paths).unwrap();

    assert!(restored.uniforms().contains("u_Test"));
    assert!(restored.uniforms().contains("u_MVP"));
    assert!(restored.uniforms().contains("u_Position"));
    // Slots resolve against the restored program.
    assert!(restored.uniforms().slot("u_Test").is_some());
}

#[test]
fn instance_value_payloads_decode_identically() {
    let paths = test_paths("instance");
    let device = RenderDevice::headless();

    let mut material = basic_material(&device, &paths);
    material.declare_uniform("u_Color").unwrap();

    let plain = material.to_bytes(false);
    let instanced = material.to_bytes(true);
    assert_ne!(plain, instanced);

    let mut from_plain = Material::new(&device).unwrap();
    from_plain.set_from_bytes(&plain, &paths).unwrap();
    let mut from_instanced = Material::new(&device).unwrap();
    from_instanced.set_from_bytes(&instanced, &paths).unwrap();

    let plain_names: Vec<&str> = from_plain.uniforms().names().collect();
    let instanced_names: Vec<&str> = from_instanced.uniforms().names().collect();
    assert_eq!(plain_names, instanced_names);
}

#[test]
fn save_and_load_through_the_materials_directory() {
    let paths = test_paths("save-load");
    let device = RenderDevice::headless();

    let mut material = basic_material(&device, &paths);
    material.declare_uniform("u_Color").unwrap();
    material.save("basic", &paths).unwrap();

    assert!(paths.material_file("basic").exists());

    let mut restored = Material::new(&device).unwrap();
    restored.load("basic", &paths).unwrap();
    assert!(restored.program().is_compiled());
    assert!(restored.uniforms().contains("u_Color"));
}

#[test]
fn loading_a_missing_material_reports_resource_not_found() {
    let paths = test_paths("missing");
    let device = RenderDevice::headless();
    let mut material = Material::new(&device).unwrap();
    assert!(matches!(
        material.load("does-not-exist", &paths),
        Err(RenderError::ResourceNotFound(_))
    ));
}

#[test]
fn unknown_tags_are_skipped_leniently_and_rejected_strictly() {
    let paths = test_paths("unknown-tag");
    let device = RenderDevice::headless();

    let mut material = basic_material(&device, &paths);
    material.declare_uniform("u_Color").unwrap();

    // Splice a record with a tag this version does not know.
    let mut text = decode_utf16_le(&material.to_bytes(false), DecodeMode::Strict).unwrap();
    text.push_str("z\u{00A6}from-the-future\t");
    let bytes = encode_utf16_le(&text);

    let mut lenient = Material::new(&device).unwrap();
    lenient.set_from_bytes(&bytes, &paths).unwrap();
    assert!(lenient.uniforms().contains("u_Color"));

    let mut strict = Material::new(&device).unwrap();
    assert!(matches!(
        strict.set_from_bytes_with(&bytes, &paths, DecodeMode::Strict),
        Err(RenderError::Decode(DecodeError::UnknownTag(_)))
    ));
}

#[test]
fn separatorless_records_are_skipped_leniently() {
    let paths = test_paths("blank-records");
    let device = RenderDevice::headless();

    let material = basic_material(&device, &paths);
    let mut text = decode_utf16_le(&material.to_bytes(false), DecodeMode::Strict).unwrap();
    text.insert_str(0, "garbage-without-separator\t");
    let bytes = encode_utf16_le(&text);

    let mut lenient = Material::new(&device).unwrap();
    lenient.set_from_bytes(&bytes, &paths).unwrap();
    assert!(lenient.program().is_compiled());

    let mut strict = Material::new(&device).unwrap();
    assert!(matches!(
        strict.set_from_bytes_with(&bytes, &paths, DecodeMode::Strict),
        Err(RenderError::Decode(DecodeError::MalformedRecord(_)))
    ));
}

#[test]
fn decode_fails_when_a_stage_source_is_missing() {
    let paths = test_paths("missing-shader");
    let device = RenderDevice::headless();

    let material = basic_material(&device, &paths);
    let bytes = material.to_bytes(false);

    // Same payload, resolved against a root with no shader files.
    let empty_paths = AssetPaths::new(std::env::temp_dir().join("silene-empty-root"));
    let mut restored = Material::new(&device).unwrap();
    assert!(matches!(
        restored.set_from_bytes(&bytes, &empty_paths),
        Err(RenderError::ResourceNotFound(_))
    ));
}

#[test]
fn payload_is_utf16_little_endian() {
    let paths = test_paths("encoding");
    let device = RenderDevice::headless();

    let material = basic_material(&device, &paths);
    let bytes = material.to_bytes(false);

    // Every record starts with an ASCII tag, so the second byte of the
    // payload is the high byte of a UTF-16LE code unit: zero.
    assert!(bytes.len() >= 2);
    assert_eq!(bytes[0], b's');
    assert_eq!(bytes[1], 0);
    assert_eq!(bytes.len() % 2, 0);
}
