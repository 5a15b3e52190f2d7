//! Headless walkthrough of the material and persistence layer.
//!
//! Builds a material from on-disk shader sources, saves it to a `.mtrl`
//! file, reloads it into a fresh material, then drives a few frames of a
//! quad draw through the headless backend and reports what reached the
//! graphics state.

use std::sync::Arc;

use nalgebra::{Matrix4, Vector3, Vector4};

use silene_app::{App, AppConfig, AppContext, AppHandler};
use silene_core::paths::AssetPaths;
use silene_core::vertex::PositionVertex;
use silene_graphics::{
    HeadlessBackend, Material, Mesh, RenderDevice, RenderResult, ShaderProgram, ShaderStage,
};

const DEMO_VERT: &str = "\
#version 330 core
layout (location = 0) in vec3 aPosition;

uniform mat4 u_MVP;
uniform vec3 u_Position;

void main()
{
    gl_Position = u_MVP * vec4(aPosition + u_Position, 1.0);
}
";

const DEMO_FRAG: &str = "\
#version 330 core
out vec4 FragColor;

uniform vec4 u_Color;
uniform float u_Time;

void main()
{
    FragColor = u_Color;
}
";

struct MaterialDemo {
    material: Material,
    mesh: Mesh<PositionVertex>,
    elapsed: f32,
}

impl MaterialDemo {
    fn render(&mut self, frame: u64) -> RenderResult<()> {
        let pulse = 0.5 + 0.5 * (frame as f32 * 0.1).sin();
        self.material
            .set_uniform("u_Color", Vector4::new(pulse, 0.8, 0.7, 1.0))?;
        self.material.set_uniform("u_Time", self.elapsed)?;

        self.material.bind()?;
        self.mesh.draw()
    }
}

impl AppHandler for MaterialDemo {
    fn on_update(&mut self, ctx: &mut AppContext) {
        self.elapsed += ctx.delta_seconds();
        if let Err(error) = self.render(ctx.frame_number()) {
            log::error!("frame {} failed: {error}", ctx.frame_number());
            ctx.request_exit();
        }
    }

    fn on_shutdown(&mut self, _ctx: &mut AppContext) {
        self.material.dispose();
        log::info!("demo handler shut down after {:.3}s", self.elapsed);
    }
}

/// Author a material against the staged shader pair and persist it.
fn author_material(device: &Arc<RenderDevice>, paths: &AssetPaths) -> RenderResult<()> {
    let mut program = ShaderProgram::new(device);
    program.open("demo.vert", ShaderStage::Vertex, paths)?;
    program.open("demo.frag", ShaderStage::Fragment, paths)?;
    program.compile()?;

    let mut material = Material::with_program(device, Arc::new(program));
    material.set_uniform("u_MVP", Matrix4::<f32>::identity())?;
    material.set_uniform("u_Position", Vector3::new(0.0f32, 0.0, 0.0))?;
    material.set_uniform("u_Color", Vector4::new(0.5f32, 0.8, 0.7, 1.0))?;
    material.set_uniform("u_Time", 0.0f32)?;
    material.save("demo", paths)?;

    log::info!("saved material to {}", paths.material_file("demo").display());
    Ok(())
}

/// Reload the persisted material and build the quad it draws.
fn load_scene(
    device: &Arc<RenderDevice>,
    paths: &AssetPaths,
) -> RenderResult<(Material, Mesh<PositionVertex>)> {
    let mut material = Material::new(device)?;
    material.load("demo", paths)?;
    material.set_uniform("u_MVP", Matrix4::<f32>::identity())?;
    material.set_uniform("u_Position", Vector3::new(0.0f32, 0.0, 0.0))?;

    let mut mesh = Mesh::new(device);
    mesh.set_vertices(vec![
        PositionVertex::new(-0.5, -0.5, 0.0),
        PositionVertex::new(0.5, -0.5, 0.0),
        PositionVertex::new(0.5, 0.5, 0.0),
        PositionVertex::new(-0.5, 0.5, 0.0),
    ]);
    mesh.set_indices(vec![0, 1, 2, 2, 3, 0])?;
    mesh.upload()?;

    Ok((material, mesh))
}

fn run(backend: Arc<HeadlessBackend>, paths: AssetPaths) -> RenderResult<()> {
    let device = RenderDevice::new(backend.clone());

    author_material(&device, &paths)?;
    let (material, mesh) = load_scene(&device, &paths)?;

    let handler = MaterialDemo {
        material,
        mesh,
        elapsed: 0.0,
    };
    let mut app = App::new(
        handler,
        device,
        paths,
        AppConfig::new().with_title("Material demo"),
    );
    app.run_frames(60);

    log::info!(
        "headless backend recorded {} draw calls",
        backend.draw_call_count()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let paths = AssetPaths::new(std::env::temp_dir().join("silene-material-demo"));
    if let Err(error) = std::fs::create_dir_all(paths.shaders())
        .and_then(|_| std::fs::write(paths.shader_file("demo.vert"), DEMO_VERT))
        .and_then(|_| std::fs::write(paths.shader_file("demo.frag"), DEMO_FRAG))
    {
        log::error!("failed to stage demo assets: {error}");
        std::process::exit(1);
    }

    if let Err(error) = run(Arc::new(HeadlessBackend::new()), paths) {
        log::error!("demo failed: {error}");
        std::process::exit(1);
    }
}
