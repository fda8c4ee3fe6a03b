//! Built-in demo producers: a signal source for the plots and a small
//! interactive-marker server.
//!
//! Everything runs on a background thread and talks to the viewer only
//! through the topic bus, exactly like a real network layer would. The
//! marker server answers user feedback by echoing the pose back as an
//! update, closing the full round trip.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use glam::{DQuat, DVec3};
use rand::Rng;
use vantage_msgs::{
    ColorRgba, InteractionMode, InteractiveMarker, InteractiveMarkerControl,
    InteractiveMarkerFeedback, InteractiveMarkerInit, InteractiveMarkerPose,
    InteractiveMarkerUpdate, Marker, MarkerKind, Pose, Value,
};
use vantage_topics::TopicBus;

pub const SIGNAL_TOPIC: &str = "demo/signal";
pub const MARKER_NAMESPACE: &str = "demo/markers";

pub fn spawn_demo(bus: Arc<TopicBus>, shutdown: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::Builder::new()
        .name("demo-source".to_string())
        .spawn(move || run(bus, shutdown))
        .expect("failed to spawn demo thread")
}

fn run(bus: Arc<TopicBus>, shutdown: Arc<AtomicBool>) {
    bus.publish(&format!("{MARKER_NAMESPACE}/init"), marker_init());

    // Server side of the feedback loop: confirm the user's pose by sending
    // it back as a regular pose update.
    let feedback = bus.subscribe::<InteractiveMarkerFeedback>(&format!("{MARKER_NAMESPACE}/feedback"));
    let echo = bus.clone();
    feedback.set_callback(move |fb| {
        tracing::info!(
            marker = %fb.marker_name,
            control = %fb.control_name,
            x = fb.pose.position.x,
            y = fb.pose.position.y,
            z = fb.pose.position.z,
            "marker feedback"
        );
        echo.publish(
            &format!("{MARKER_NAMESPACE}/update"),
            InteractiveMarkerUpdate {
                poses: vec![InteractiveMarkerPose {
                    name: fb.marker_name.clone(),
                    pose: fb.pose,
                }],
                ..Default::default()
            },
        );
    });

    let mut rng = rand::thread_rng();
    let start = Instant::now();
    let mut tick: u64 = 0;
    while !shutdown.load(Ordering::Relaxed) {
        let t = start.elapsed().as_secs_f64();

        let mut signal = BTreeMap::new();
        signal.insert("sin".to_string(), Value::F64((t * 0.8).sin()));
        signal.insert(
            "noisy".to_string(),
            Value::F64((t * 0.8).sin() + rng.gen_range(-0.15..0.15)),
        );
        signal.insert("ramp".to_string(), Value::F64((t % 5.0) / 5.0));
        bus.publish(SIGNAL_TOPIC, Value::Map(signal));

        // The beacon orbits on pose-only updates, ~10 Hz.
        if tick % 3 == 0 {
            let angle = t * 0.4;
            bus.publish(
                &format!("{MARKER_NAMESPACE}/update"),
                InteractiveMarkerUpdate {
                    poses: vec![InteractiveMarkerPose {
                        name: "beacon".to_string(),
                        pose: Pose {
                            position: DVec3::new(2.0 * angle.cos(), 0.8, 2.0 * angle.sin()),
                            orientation: DQuat::from_axis_angle(DVec3::Y, -angle),
                        },
                    }],
                    ..Default::default()
                },
            );
        }

        tick += 1;
        thread::sleep(Duration::from_millis(33));
    }
}

fn marker_init() -> InteractiveMarkerInit {
    let probe = InteractiveMarker {
        name: "probe".to_string(),
        description: "probe".to_string(),
        pose: Pose::from_position(DVec3::new(0.0, 0.5, 0.0)),
        scale: 0.8,
        controls: vec![
            InteractiveMarkerControl {
                name: "grab".to_string(),
                interaction_mode: InteractionMode::Move3d.to_wire(),
                orientation: DQuat::IDENTITY,
                markers: vec![Marker {
                    kind: MarkerKind::Sphere,
                    pose: Pose::IDENTITY,
                    scale: DVec3::splat(0.5),
                    color: ColorRgba::new(0.3, 0.6, 0.9, 1.0),
                }],
            },
            InteractiveMarkerControl {
                name: "turn".to_string(),
                interaction_mode: InteractionMode::RotateAxis.to_wire(),
                // Rotation about the world y axis.
                orientation: DQuat::from_axis_angle(DVec3::Z, std::f64::consts::FRAC_PI_2),
                markers: vec![Marker {
                    kind: MarkerKind::Cylinder,
                    pose: Pose {
                        position: DVec3::ZERO,
                        orientation: DQuat::from_axis_angle(DVec3::Y, std::f64::consts::FRAC_PI_2),
                    },
                    scale: DVec3::new(1.2, 1.2, 0.05),
                    color: ColorRgba::new(0.9, 0.7, 0.2, 0.6),
                }],
            },
        ],
    };

    let beacon = InteractiveMarker {
        name: "beacon".to_string(),
        description: "beacon".to_string(),
        pose: Pose::from_position(DVec3::new(2.0, 0.8, 0.0)),
        scale: 0.5,
        controls: vec![InteractiveMarkerControl {
            name: "body".to_string(),
            interaction_mode: InteractionMode::None.to_wire(),
            orientation: DQuat::IDENTITY,
            markers: vec![Marker {
                kind: MarkerKind::Cube,
                pose: Pose::IDENTITY,
                scale: DVec3::new(0.4, 0.4, 0.4),
                color: ColorRgba::new(0.9, 0.3, 0.3, 1.0),
            }],
        }],
    };

    InteractiveMarkerInit {
        markers: vec![probe, beacon],
    }
}
