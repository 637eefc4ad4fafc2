/*!
Built-in maps.

Each map is plain scene construction through [`World`]: parts are configured while
detached and parented last, so every one gets exactly one physics object. Gameplay bits
(kill bricks, spinners) are touched and update callbacks, the same hooks user scripts get.
*/

use nalgebra::Vector3;
use shared::{NodeId, SceneError, World};
use thiserror::Error;

pub const MAP_NAMES: [&str; 3] = ["Baseplate", "Crossroads", "Tower"];

const GREY: Vector3<f32> = Vector3::new(0.63, 0.64, 0.63);
const DARK_GREY: Vector3<f32> = Vector3::new(0.25, 0.25, 0.27);
const KILL_RED: Vector3<f32> = Vector3::new(0.9, 0.1, 0.1);
const CRATE_BROWN: Vector3<f32> = Vector3::new(0.55, 0.35, 0.15);

/// Spin rate of tower spinners (rad/s).
const SPIN_RATE: f32 = 1.5;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("unknown map '{0}', expected one of {MAP_NAMES:?}")]
    UnknownMap(String),

    #[error("cannot create a {0}")]
    UnknownClass(&'static str),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    pub name: &'static str,
    /// Top center of the spawn location.
    pub spawn_point: Vector3<f32>,
}

pub fn load_map(world: &mut World, name: &str) -> Result<Level, LevelError> {
    let level = match name {
        "Baseplate" => baseplate(world)?,
        "Crossroads" => crossroads(world)?,
        "Tower" => tower(world)?,
        other => return Err(LevelError::UnknownMap(other.to_string())),
    };
    log::info!(
        "loaded {} ({} nodes, {} static, {} dynamic)",
        level.name,
        world.scene().len(),
        world.physics().static_count(),
        world.physics().dynamic_body_count()
    );
    Ok(level)
}

struct PartSpec {
    name: &'static str,
    size: Vector3<f32>,
    position: Vector3<f32>,
    color: Vector3<f32>,
    anchored: bool,
}

impl PartSpec {
    fn block(name: &'static str, size: [f32; 3], position: [f32; 3], color: Vector3<f32>) -> Self {
        Self {
            name,
            size: size.into(),
            position: position.into(),
            color,
            anchored: true,
        }
    }

    fn loose(mut self) -> Self {
        self.anchored = false;
        self
    }
}

fn create(world: &mut World, class: &'static str) -> Result<NodeId, LevelError> {
    world.create(class).ok_or(LevelError::UnknownClass(class))
}

fn place(world: &mut World, spec: PartSpec, parent: NodeId) -> Result<NodeId, LevelError> {
    let id = create(world, "Part")?;
    world.set_name(id, spec.name)?;
    world.set_size(id, spec.size)?;
    world.set_position(id, spec.position)?;
    world.set_color(id, spec.color)?;
    world.set_anchored(id, spec.anchored)?;
    world.set_parent(id, Some(parent))?;
    Ok(id)
}

fn group(
    world: &mut World,
    class: &'static str,
    name: &str,
    parent: NodeId,
) -> Result<NodeId, LevelError> {
    let id = create(world, class)?;
    world.set_name(id, name)?;
    world.set_parent(id, Some(parent))?;
    Ok(id)
}

/// 100x1x100 floor with its top at y = 0 and a spawn location in the middle.
fn floor_and_spawn(world: &mut World) -> Result<Vector3<f32>, LevelError> {
    let workspace = world.workspace();
    place(
        world,
        PartSpec::block("Baseplate", [100.0, 1.0, 100.0], [0.0, -0.5, 0.0], GREY),
        workspace,
    )?;
    let spawn = create(world, "SpawnLocation")?;
    world.set_position(spawn, Vector3::new(0.0, 0.5, 0.0))?;
    world.set_parent(spawn, Some(workspace))?;
    Ok(Vector3::new(0.0, 1.0, 0.0))
}

/// Anything named `Character` that touches `brick` is sent back to `spawn_point`.
fn connect_kill_brick(world: &mut World, brick: NodeId, spawn_point: Vector3<f32>) {
    world.connect_touched(
        brick,
        Box::new(move |world, _, other| {
            if world.scene().name(other) == Some("Character") {
                log::info!("kill brick hit, back to spawn");
                world.set_position(other, spawn_point + Vector3::y() * 3.0)?;
            }
            Ok(())
        }),
    );
}

fn connect_spinner(world: &mut World, spinner: NodeId) {
    let mut angle = 0.0f32;
    world.bind_to_update(Box::new(move |world, dt| {
        if !world.scene().contains(spinner) {
            return Ok(());
        }
        angle = (angle + SPIN_RATE * dt).rem_euclid(std::f32::consts::TAU);
        world.set_rotation(spinner, Vector3::new(0.0, angle, 0.0))?;
        Ok(())
    }));
}

fn baseplate(world: &mut World) -> Result<Level, LevelError> {
    Ok(Level {
        name: "Baseplate",
        spawn_point: floor_and_spawn(world)?,
    })
}

pub(crate) const CROSSROADS_KILL_BRICK: Vector3<f32> = Vector3::new(30.0, 0.25, 30.0);

fn crossroads(world: &mut World) -> Result<Level, LevelError> {
    let spawn_point = floor_and_spawn(world)?;
    let workspace = world.workspace();

    let roads = group(world, "Model", "Roads", workspace)?;
    for spec in [
        PartSpec::block("RoadNS", [8.0, 0.2, 100.0], [0.0, 0.1, 0.0], DARK_GREY),
        PartSpec::block("RoadEW", [100.0, 0.2, 8.0], [0.0, 0.1, 0.0], DARK_GREY),
    ] {
        place(world, spec, roads)?;
    }

    let buildings = group(world, "Model", "Buildings", workspace)?;
    for (i, (x, z)) in [(-25.0, -25.0), (25.0, -25.0), (-25.0, 25.0)].into_iter().enumerate() {
        let height = 8.0 + 4.0 * i as f32;
        place(
            world,
            PartSpec::block(
                "Building",
                [14.0, height, 14.0],
                [x, height / 2.0, z],
                Vector3::new(0.4 + 0.15 * i as f32, 0.45, 0.6),
            ),
            buildings,
        )?;
    }

    let crates = group(world, "Folder", "Crates", workspace)?;
    for i in 0..4 {
        place(
            world,
            PartSpec::block(
                "Crate",
                [2.0, 2.0, 2.0],
                [10.0, 1.0 + 2.0 * i as f32, -10.0],
                CRATE_BROWN,
            )
            .loose(),
            crates,
        )?;
    }

    let brick = place(
        world,
        PartSpec::block(
            "KillBrick",
            [10.0, 0.5, 10.0],
            CROSSROADS_KILL_BRICK.into(),
            KILL_RED,
        ),
        workspace,
    )?;
    connect_kill_brick(world, brick, spawn_point);

    Ok(Level {
        name: "Crossroads",
        spawn_point,
    })
}

fn tower(world: &mut World) -> Result<Level, LevelError> {
    let spawn_point = floor_and_spawn(world)?;
    let workspace = world.workspace();

    let stairs = group(world, "Model", "Stairs", workspace)?;
    const STEPS: usize = 24;
    const RADIUS: f32 = 14.0;
    for i in 0..STEPS {
        let angle = i as f32 * std::f32::consts::TAU / 12.0;
        let y = 1.5 * (i + 1) as f32;
        place(
            world,
            PartSpec::block(
                "Step",
                [4.0, 1.0, 4.0],
                [RADIUS * angle.cos(), y, RADIUS * angle.sin()],
                Vector3::new(0.3, 0.3 + 0.025 * i as f32, 0.8),
            ),
            stairs,
        )?;
    }

    let top = 1.5 * (STEPS + 1) as f32;
    place(
        world,
        PartSpec::block("Summit", [12.0, 1.0, 12.0], [0.0, top, 0.0], GREY),
        workspace,
    )?;
    let spinner = place(
        world,
        PartSpec::block("Spinner", [10.0, 0.5, 1.0], [0.0, top + 1.0, 0.0], KILL_RED),
        workspace,
    )?;
    connect_kill_brick(world, spinner, spawn_point);
    connect_spinner(world, spinner);

    Ok(Level {
        name: "Tower",
        spawn_point,
    })
}
