// moto_core/src/debug_vis.rs

//! Optional debug primitives mirroring the controller's view of the vehicle:
//! collision box, suspension attachment points, wheel contacts and lateral tire
//! forces, collision-tester cylinders and the desired up vector.
//!
//! Primitives are created lazily the first time they are shown and released as a
//! group when visualization is switched off or the vehicle is destroyed.

use nalgebra::{Isometry3, Matrix4, Point3, Rotation3, UnitQuaternion, Vector3};
use std::f64::consts::PI;

use crate::abstractions::{DebugRenderer, PrimitiveShape, WheelState};
use crate::types::{PrimitiveHandle, Rgba, WHEEL_COUNT};

const BODY_COLOR: Rgba = Rgba::new(1.0, 0.0, 0.0, 0.2);
const ATTACH_COLOR: Rgba = Rgba::new(0.0, 0.0, 1.0, 0.5);
const CONTACT_COLOR: Rgba = Rgba::new(0.0, 1.0, 0.0, 1.0);
const LATERAL_FORCE_COLOR: Rgba = Rgba::new(0.6, 0.6, 0.0, 1.0);
const COLLISION_TESTER_COLOR: Rgba = Rgba::new(0.0, 0.0, 1.0, 0.5);
const DESIRED_UP_COLOR: Rgba = Rgba::new(0.0, 0.0, 1.0, 0.5);

const MARKER_RADIUS: f64 = 0.03;
/// Lateral impulses below this are not drawn.
const MIN_LATERAL_IMPULSE: f64 = 1.0e-3;
const LATERAL_ARROW_SCALE: f64 = 0.1;
/// Lifts the lateral arrows off the ground so they are not hidden by it.
const LATERAL_ARROW_LIFT: f64 = 0.02;

/// Where primitives with nothing to show are parked.
pub fn hidden_transform() -> Matrix4<f64> {
    Matrix4::new_translation(&Vector3::new(0.0, 0.0, -1000.0))
}

/// Places the unit arrow (origin to +X) so it runs from `start` to `end`.
pub fn arrow_transform(start: &Point3<f64>, end: &Point3<f64>, radius_scale: f64) -> Matrix4<f64> {
    let span = end - start;
    let rotation = Rotation3::rotation_between(&Vector3::x(), &span)
        .unwrap_or_else(|| Rotation3::from_axis_angle(&Vector3::z_axis(), PI));
    Matrix4::new_translation(&start.coords)
        * rotation.to_homogeneous()
        * Matrix4::new_nonuniform_scaling(&Vector3::new(span.norm(), radius_scale, radius_scale))
}

/// Places the unit cube `[0, 1]^3` so it spans the box `min..max`.
pub fn aabb_transform(min: &Vector3<f64>, max: &Vector3<f64>) -> Matrix4<f64> {
    Matrix4::new_translation(min) * Matrix4::new_nonuniform_scaling(&(max - min))
}

// =========================================================================
// == Snapshot ==
// =========================================================================

/// Per-wheel data the visualizer needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugWheel {
    /// Suspension attachment point in body space.
    pub attach_position: Vector3<f64>,
    pub radius: f64,
    pub width: f64,
    pub state: WheelState,
}

/// Vehicle state captured for one debug frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugSnapshot {
    pub body_transform: Isometry3<f64>,
    /// `R^-1`, so the y-forward box can be drawn in model space.
    pub sim_to_model: UnitQuaternion<f64>,
    /// Collision box half-extents in y-forward space.
    pub half_extents: Vector3<f64>,
    pub wheels: [DebugWheel; WHEEL_COUNT],
    /// Zero when the roll controller has not produced a target yet.
    pub desired_up: Vector3<f64>,
}

// =========================================================================
// == Primitive Set ==
// =========================================================================

/// Renderer-owned debug primitives, each created on first show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugPrimitiveSet {
    pub body: Option<PrimitiveHandle>,
    pub wheel_attach: [Option<PrimitiveHandle>; WHEEL_COUNT],
    pub contact_point: [Option<PrimitiveHandle>; WHEEL_COUNT],
    pub lateral_force: [Option<PrimitiveHandle>; WHEEL_COUNT],
    pub collision_tester: [Option<PrimitiveHandle>; WHEEL_COUNT],
    pub desired_up: Option<PrimitiveHandle>,
}

impl DebugPrimitiveSet {
    /// Every handle slot, filled or not.
    fn slots_mut(&mut self) -> impl Iterator<Item = &mut Option<PrimitiveHandle>> {
        std::iter::once(&mut self.body)
            .chain(self.wheel_attach.iter_mut())
            .chain(self.contact_point.iter_mut())
            .chain(self.lateral_force.iter_mut())
            .chain(self.collision_tester.iter_mut())
            .chain(std::iter::once(&mut self.desired_up))
    }

    pub fn handles(&self) -> Vec<PrimitiveHandle> {
        std::iter::once(&self.body)
            .chain(self.wheel_attach.iter())
            .chain(self.contact_point.iter())
            .chain(self.lateral_force.iter())
            .chain(self.collision_tester.iter())
            .chain(std::iter::once(&self.desired_up))
            .filter_map(|h| *h)
            .collect()
    }

    pub fn owned_count(&self) -> usize {
        self.handles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.owned_count() == 0
    }
}

fn place(
    slot: &mut Option<PrimitiveHandle>,
    renderer: &mut dyn DebugRenderer,
    shape: PrimitiveShape,
    color: Rgba,
    transform: &Matrix4<f64>,
) {
    match slot {
        Some(handle) => renderer.set_primitive_transform(*handle, transform),
        None => *slot = Some(renderer.create_primitive(shape, transform, color)),
    }
}

// =========================================================================
// == Visualizer ==
// =========================================================================

#[derive(Debug, Default)]
pub struct DebugVisualizer {
    primitives: DebugPrimitiveSet,
}

impl DebugVisualizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primitives(&self) -> &DebugPrimitiveSet {
        &self.primitives
    }

    /// Shows (creating as needed) or releases the primitives.
    pub fn update(&mut self, renderer: &mut dyn DebugRenderer, snapshot: &DebugSnapshot, show: bool) {
        if show {
            self.show(renderer, snapshot);
        } else {
            self.release(renderer);
        }
    }

    /// Creates missing primitives and moves every primitive to match `snapshot`.
    pub fn show(&mut self, renderer: &mut dyn DebugRenderer, snapshot: &DebugSnapshot) {
        let body = snapshot.body_transform.to_homogeneous();
        let p = &mut self.primitives;

        // --- Collision box, drawn in y-forward space then taken into model space ---
        let box_transform = body
            * snapshot.sim_to_model.to_homogeneous()
            * aabb_transform(&-snapshot.half_extents, &snapshot.half_extents);
        place(&mut p.body, renderer, PrimitiveShape::Box, BODY_COLOR, &box_transform);

        for (i, wheel) in snapshot.wheels.iter().enumerate() {
            // --- Suspension attachment point ---
            let attach = body
                * Matrix4::new_translation(&wheel.attach_position)
                * Matrix4::new_scaling(MARKER_RADIUS);
            place(
                &mut p.wheel_attach[i],
                renderer,
                PrimitiveShape::Sphere,
                ATTACH_COLOR,
                &attach,
            );

            // --- Ground contact point ---
            let contact = if wheel.state.has_contact {
                Matrix4::new_translation(&wheel.state.contact_position.coords)
                    * Matrix4::new_scaling(MARKER_RADIUS)
            } else {
                hidden_transform()
            };
            place(
                &mut p.contact_point[i],
                renderer,
                PrimitiveShape::Sphere,
                CONTACT_COLOR,
                &contact,
            );

            // --- Lateral tire force ---
            let lateral = if wheel.state.has_contact
                && wheel.state.lateral_impulse.abs() > MIN_LATERAL_IMPULSE
            {
                let origin = wheel.state.contact_position + Vector3::new(0.0, 0.0, LATERAL_ARROW_LIFT);
                let end = origin
                    + wheel.state.contact_lateral * wheel.state.lateral_impulse * LATERAL_ARROW_SCALE;
                arrow_transform(&origin, &end, 1.0)
            } else {
                hidden_transform()
            };
            place(
                &mut p.lateral_force[i],
                renderer,
                PrimitiveShape::Arrow,
                LATERAL_FORCE_COLOR,
                &lateral,
            );

            // --- Collision tester, the unit cylinder centred on the wheel's axle ---
            let tester = body
                * wheel.state.local_transform.to_homogeneous()
                * Matrix4::new_nonuniform_scaling(&Vector3::new(wheel.radius, wheel.radius, wheel.width))
                * Matrix4::new_translation(&Vector3::new(0.0, 0.0, -0.5));
            place(
                &mut p.collision_tester[i],
                renderer,
                PrimitiveShape::Cylinder,
                COLLISION_TESTER_COLOR,
                &tester,
            );
        }

        // --- Desired up vector ---
        let desired_up = if snapshot.desired_up.norm() > 1.0e-3 {
            let start = Point3::from(snapshot.body_transform.translation.vector);
            arrow_transform(&start, &(start + snapshot.desired_up), 1.0)
        } else {
            hidden_transform()
        };
        place(
            &mut p.desired_up,
            renderer,
            PrimitiveShape::Arrow,
            DESIRED_UP_COLOR,
            &desired_up,
        );
    }

    /// Returns every owned primitive to the renderer. Safe to call repeatedly.
    pub fn release(&mut self, renderer: &mut dyn DebugRenderer) {
        for slot in self.primitives.slots_mut() {
            if let Some(handle) = slot.take() {
                renderer.remove_primitive(handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingRenderer;
    use approx::assert_abs_diff_eq;
    use nalgebra::Translation3;

    const FULL_SET: usize = 1 + 4 * WHEEL_COUNT + 1;

    fn snapshot(grounded: bool) -> DebugSnapshot {
        let wheel = |y: f64| DebugWheel {
            attach_position: Vector3::new(0.0, y, 0.0),
            radius: 0.35,
            width: 0.17,
            state: WheelState {
                has_contact: grounded,
                contact_position: Point3::new(0.0, y, 0.0),
                lateral_impulse: 2.0,
                ..WheelState::default()
            },
        };
        DebugSnapshot {
            body_transform: Isometry3::from_parts(
                Translation3::new(0.0, 0.0, 0.5),
                UnitQuaternion::identity(),
            ),
            sim_to_model: UnitQuaternion::identity(),
            half_extents: Vector3::new(0.15, 0.9, 0.3),
            wheels: [wheel(0.85), wheel(-0.85)],
            desired_up: Vector3::z(),
        }
    }

    #[test]
    fn showing_twice_creates_once() {
        let mut renderer = RecordingRenderer::new();
        let mut vis = DebugVisualizer::new();
        vis.update(&mut renderer, &snapshot(true), true);
        vis.update(&mut renderer, &snapshot(true), true);

        assert_eq!(renderer.created, FULL_SET);
        assert_eq!(renderer.live_count(), FULL_SET);
        assert_eq!(vis.primitives().owned_count(), FULL_SET);
    }

    #[test]
    fn hiding_releases_everything_and_is_idempotent() {
        let mut renderer = RecordingRenderer::new();
        let mut vis = DebugVisualizer::new();
        vis.update(&mut renderer, &snapshot(true), true);
        vis.update(&mut renderer, &snapshot(true), false);
        assert!(vis.primitives().is_empty());
        assert_eq!(renderer.live_count(), 0);

        // A second hide has nothing left to remove.
        vis.update(&mut renderer, &snapshot(true), false);
        assert_eq!(renderer.live_count(), 0);

        // Showing again recreates the set.
        vis.update(&mut renderer, &snapshot(true), true);
        assert_eq!(renderer.live_count(), FULL_SET);
        assert_eq!(renderer.created, 2 * FULL_SET);
    }

    #[test]
    fn airborne_wheel_markers_are_parked_out_of_view() {
        let mut renderer = RecordingRenderer::new();
        let mut vis = DebugVisualizer::new();
        vis.show(&mut renderer, &snapshot(false));

        let handle = vis.primitives().contact_point[0].unwrap();
        assert_eq!(renderer.live[&handle].transform, hidden_transform());
        let handle = vis.primitives().lateral_force[1].unwrap();
        assert_eq!(renderer.live[&handle].transform, hidden_transform());
    }

    #[test]
    fn body_box_spans_the_half_extents() {
        let mut renderer = RecordingRenderer::new();
        let mut vis = DebugVisualizer::new();
        vis.show(&mut renderer, &snapshot(true));

        let handle = vis.primitives().body.unwrap();
        let t = renderer.live[&handle].transform;
        let min = t.transform_point(&Point3::origin());
        let max = t.transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert_abs_diff_eq!(min, Point3::new(-0.15, -0.9, 0.2), epsilon = 1e-12);
        assert_abs_diff_eq!(max, Point3::new(0.15, 0.9, 0.8), epsilon = 1e-12);
    }

    #[test]
    fn arrow_runs_from_start_to_end() {
        let start = Point3::new(1.0, 2.0, 3.0);
        for end in [
            Point3::new(1.0, 2.0, 4.0),
            Point3::new(-2.0, 2.0, 3.0),
            Point3::new(0.0, 0.0, 0.0),
        ] {
            let t = arrow_transform(&start, &end, 1.0);
            assert_abs_diff_eq!(t.transform_point(&Point3::origin()), start, epsilon = 1e-9);
            assert_abs_diff_eq!(
                t.transform_point(&Point3::new(1.0, 0.0, 0.0)),
                end,
                epsilon = 1e-9
            );
        }
    }
}
