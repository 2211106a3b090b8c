//! kestrel-sim — headless driver for the kestrel runtime.
//!
//! Builds a small scene (sun, ground, a few falling boxes that despawn after
//! a while) and runs the frame loop without a window: every frame is drawn
//! into a [`DrawRecorder`] and a JSON summary is logged once per simulated
//! second.
//!
//! ```text
//! kestrel-sim [config.json] [frames] [model.obj]
//! ```
//!
//! Logging goes through `env_logger`; set `RUST_LOG=debug` to see entity
//! lifecycle events. Build with `--features physics3d` to use Rapier instead
//! of the inert backend.

use std::path::PathBuf;

use kestrel::prelude::*;
use kestrel::render::vertex;

const DEFAULT_FRAMES: u64 = 600;
const DUCK_COUNT: usize = 4;
/// Seconds a duck lives before it removes itself.
const DUCK_LIFETIME: f64 = 4.0;

/// Stand-in GPU: hands out mesh ids and counts uploaded bytes.
#[derive(Default)]
struct HeadlessUploader {
    next: u64,
    bytes: usize,
}

impl MeshUploader for HeadlessUploader {
    fn upload(&mut self, name: &str, vertices: &[Vertex]) -> MeshHandle {
        self.next += 1;
        self.bytes += vertex::as_bytes(vertices).len();
        log::debug!("uploaded mesh #{} '{name}' ({} vertices)", self.next, vertices.len());
        MeshHandle(self.next)
    }
}

/// Removes its entity once it has lived for `lifetime` seconds.
struct Lifetime {
    remaining: f64,
}

impl Component for Lifetime {
    fn capabilities(&self) -> Capabilities {
        Capabilities::from(Capability::Behavior)
    }

    fn as_behavior_mut(&mut self) -> Option<&mut dyn Behavior> {
        Some(self)
    }
}

impl Behavior for Lifetime {
    fn on_update(&mut self, dt: f64, entity: &Entity) {
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            log::info!("entity {} expired", entity.id());
            entity.remove();
        }
    }
}

struct Args {
    config: Option<PathBuf>,
    frames: u64,
    model: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let config = args.next().map(PathBuf::from);
        let frames = match args.next() {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                log::warn!("invalid frame count '{raw}' ({e}), using {DEFAULT_FRAMES}");
                DEFAULT_FRAMES
            }),
            None => DEFAULT_FRAMES,
        };
        let model = args.next().map(PathBuf::from);
        Self {
            config,
            frames,
            model,
        }
    }
}

/// Unit cube as a flat triangle list.
fn cube_vertices() -> Vec<Vertex> {
    let faces: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::NEG_Y, Vec3::Z),
        (Vec3::Y, Vec3::NEG_X, Vec3::Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];
    let mut vertices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let corner = |su: f32, sv: f32| {
            let p = (normal + u * su + v * sv) * 0.5;
            Vertex::new(p.to_array(), normal.to_array(), [(su + 1.0) * 0.5, (sv + 1.0) * 0.5])
        };
        let quad = [corner(-1.0, -1.0), corner(1.0, -1.0), corner(1.0, 1.0), corner(-1.0, 1.0)];
        vertices.extend([quad[0], quad[1], quad[2], quad[0], quad[2], quad[3]]);
    }
    vertices
}

fn spawn_duck(world: &mut World, model: Model, index: usize) -> Entity {
    let duck = Entity::compound();
    let body = BodyDesc::dynamic_box(Vec3::splat(0.5))
        .at(Vec3::new(index as f32 * 1.5, 0.0, 5.0 + index as f32))
        .with_restitution(0.3);
    duck.add(PhysicsComponent::new(body));
    duck.add(ModelComponent::new(model).with_color([1.0, 0.0, 0.0, 1.0]));
    duck.add(Lifetime {
        remaining: DUCK_LIFETIME + index as f64,
    });
    world.add(&duck);
    duck
}

#[cfg(feature = "physics3d")]
fn backend(config: &WorldConfig) -> Box<dyn PhysicsBackend> {
    Box::new(RapierBackend::new(&config.physics))
}

#[cfg(not(feature = "physics3d"))]
fn backend(_config: &WorldConfig) -> Box<dyn PhysicsBackend> {
    log::info!("built without physics3d, bodies will not move");
    Box::new(NullBackend::new())
}

fn main() -> kestrel::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig::default(),
    };
    config.physics.ground.get_or_insert([50.0, 50.0, 0.5]);

    let mut world = World::with_backend(&config, backend(&config));
    let mut uploader = HeadlessUploader::default();
    let mut assets = AssetCache::new();

    let model = match &args.model {
        Some(path) => {
            let model = assets.load(path, &mut uploader)?;
            if let Err(e) = assets.watch() {
                log::warn!("hot-reload unavailable: {e}");
            }
            model
        }
        None => {
            let vertices = cube_vertices();
            Model {
                mesh: uploader.upload("cube", &vertices),
                vertex_count: vertices.len() as u32,
            }
        }
    };

    world.add(&Entity::with_component(ComponentRef::new(SunComponent::from_config(
        &config.sun,
    ))));
    for i in 0..DUCK_COUNT {
        spawn_duck(&mut world, model, i);
    }
    log::info!(
        "scene ready: {} tracked entities, {} bytes uploaded",
        world.tracked_entities().len(),
        uploader.bytes
    );

    let dt = config.physics.fixed_timestep as f64;
    let report_every = (1.0 / dt).round().max(1.0) as u64;
    let mut clock = FrameClock::new();
    let mut renderer = DrawRecorder::new();

    for frame in 1..=args.frames {
        clock.tick();
        for path in assets.process_reloads() {
            log::info!("{} will be re-read on next load", path.display());
        }

        world.update(dt);
        world.draw(&mut renderer);

        if frame % report_every == 0 || frame == args.frames {
            let sun = renderer.sun().unwrap_or(Vec3::ZERO);
            #[allow(unused_mut)]
            let mut summary = serde_json::json!({
                "frame": frame,
                "days": world.clock().days(),
                "tracked": world.tracked_entities().len(),
                "meshes": renderer.mesh_count(),
                "bodies": world.physics().backend().body_count(),
                "sun": [sun.x, sun.y, sun.z],
                "fps": clock.fps(),
            });
            #[cfg(feature = "diagnostics")]
            {
                let timings: serde_json::Map<_, _> = world
                    .last_timings()
                    .iter()
                    .map(|t| (t.name.to_string(), serde_json::json!(t.duration_us)))
                    .collect();
                summary["timings_us"] = serde_json::Value::Object(timings);
            }
            log::info!("{summary}");
        }
    }

    log::info!(
        "done after {} frames ({:.2}s wall), {} bodies released",
        renderer.frames(),
        clock.elapsed().as_secs_f64(),
        world.physics().released_bodies()
    );
    Ok(())
}
