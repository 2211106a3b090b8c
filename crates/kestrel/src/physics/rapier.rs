//! Rapier-backed [`PhysicsBackend`].
//!
//! The solver runs at a fixed timestep. Frame time goes into an accumulator
//! capped at `max_frame_dt` and is consumed in `fixed_timestep` slices, so
//! the simulation is independent of the frame rate.

use rapier3d::prelude::*;
use slotmap::SlotMap;

use super::{BodyDesc, BodyHandle, BodyKind, PhysicsBackend};
use crate::config::PhysicsConfig;
use crate::math::{Quat, Transform, Vec3};

/// Convert a glam Quat to a scaled-axis-angle Vec3 (for RigidBodyBuilder::rotation).
fn quat_to_scaled_axis(q: Quat) -> Vec3 {
    let (axis, angle) = q.to_axis_angle();
    axis * angle
}

pub struct RapierBackend {
    gravity: Vec3,
    max_frame_dt: f32,
    pipeline: PhysicsPipeline,
    params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    handles: SlotMap<BodyHandle, (RigidBodyHandle, Vec3)>,
    accumulator: f32,
}

impl std::fmt::Debug for RapierBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RapierBackend")
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .finish()
    }
}

impl RapierBackend {
    pub fn new(config: &PhysicsConfig) -> Self {
        let params = IntegrationParameters {
            dt: config.fixed_timestep,
            ..IntegrationParameters::default()
        };
        Self {
            gravity: Vec3::from(config.gravity),
            max_frame_dt: config.max_frame_dt,
            pipeline: PhysicsPipeline::new(),
            params,
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            handles: SlotMap::with_key(),
            accumulator: 0.0,
        }
    }
}

impl PhysicsBackend for RapierBackend {
    fn insert_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        let kind = match desc.kind {
            BodyKind::Dynamic => RigidBodyType::Dynamic,
            BodyKind::Fixed => RigidBodyType::Fixed,
        };
        let body = RigidBodyBuilder::new(kind)
            .translation(desc.translation)
            .rotation(quat_to_scaled_axis(desc.rotation))
            .build();
        let body_handle = self.bodies.insert(body);

        let half = desc.half_extents;
        let collider = ColliderBuilder::cuboid(half.x, half.y, half.z)
            .restitution(desc.restitution)
            .density(desc.density)
            .build();
        self.colliders
            .insert_with_parent(collider, body_handle, &mut self.bodies);

        self.handles.insert((body_handle, half))
    }

    fn remove_body(&mut self, handle: BodyHandle) {
        let Some((body_handle, _)) = self.handles.remove(handle) else {
            return;
        };
        self.bodies.remove(
            body_handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        // Capped to prevent spiral of death.
        self.accumulator += dt.min(self.max_frame_dt);

        let fixed_dt = self.params.dt;
        while self.accumulator >= fixed_dt {
            self.pipeline.step(
                self.gravity,
                &self.params,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                &(),
                &(),
            );
            self.accumulator -= fixed_dt;
        }
    }

    fn pose(&self, handle: BodyHandle) -> Option<Transform> {
        let (body_handle, _) = self.handles.get(handle)?;
        let body = self.bodies.get(*body_handle)?;
        Some(Transform::from_translation(body.translation()).with_rotation(*body.rotation()))
    }

    fn debug_shapes(&self) -> Vec<(Transform, Vec3)> {
        self.handles
            .keys()
            .filter_map(|handle| {
                let half = self.handles[handle].1;
                self.pose(handle).map(|pose| (pose, half))
            })
            .collect()
    }

    fn body_count(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_body_falls_onto_ground() {
        let config = PhysicsConfig::default();
        let mut backend = RapierBackend::new(&config);
        backend.insert_body(&BodyDesc::fixed_box(Vec3::new(10.0, 10.0, 0.5)).at(Vec3::new(0.0, 0.0, -0.5)));
        let body = backend.insert_body(&BodyDesc::dynamic_box(Vec3::splat(0.5)).at(Vec3::new(0.0, 0.0, 5.0)));

        for _ in 0..240 {
            backend.step(1.0 / 60.0);
        }

        let z = backend.pose(body).unwrap().translation.z;
        assert!(z < 5.0, "body did not fall: z = {z}");
        assert!(z > 0.0, "body went through the ground: z = {z}");
    }

    #[test]
    fn removed_body_has_no_pose() {
        let mut backend = RapierBackend::new(&PhysicsConfig::default());
        let body = backend.insert_body(&BodyDesc::dynamic_box(Vec3::ONE));
        backend.remove_body(body);
        assert!(backend.pose(body).is_none());
        assert_eq!(backend.body_count(), 0);
        backend.remove_body(body);
    }
}
