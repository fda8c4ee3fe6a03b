//! Entry point for the vantage viewer.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use glam::DVec3;
use tracing_subscriber::EnvFilter;
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

use vantage_displays::{
    Display, DisplayContext, DisplayRegistry, InteractiveMarkerDisplay,
    InteractiveMarkerDisplayConfig, InteractivePoseDisplay, MeshSource, PlotDisplay,
    PlotDisplayConfig, PoseDisplayConfig,
};
use vantage_displays::plot::{PlotQuery, PlotTopic};
use vantage_msgs::{ColorRgba, Pose};
use vantage_topics::TopicBus;
use vantage_viewer::app::{spawn_sync_loop, App, DisplaySet, PrimitiveMeshes};
use vantage_viewer::{demo, playback};

/// Live scene viewer fed by topic producers.
#[derive(Parser)]
#[command(name = "vantage")]
struct Args {
    /// Directory of .jsonl recordings to play back.
    #[arg(long)]
    records: Option<PathBuf>,

    /// Disable the built-in demo producers.
    #[arg(long)]
    no_demo: bool,

    /// Interactive-marker topic namespace to display.
    #[arg(long, default_value = demo::MARKER_NAMESPACE)]
    markers: String,
}

fn demo_plot_config() -> PlotDisplayConfig {
    PlotDisplayConfig {
        topics: vec![PlotTopic {
            topic: demo::SIGNAL_TOPIC.to_string(),
            queries: vec![
                PlotQuery {
                    query: "sin".to_string(),
                    color: ColorRgba::new(0.85, 0.60, 0.10, 1.0),
                },
                PlotQuery {
                    query: "noisy".to_string(),
                    color: ColorRgba::new(0.15, 0.55, 0.60, 1.0),
                },
            ],
        }],
        ..Default::default()
    }
}

fn build_registry(markers_namespace: &str) -> DisplayRegistry {
    let mut registry = DisplayRegistry::new();

    let namespace = markers_namespace.to_string();
    registry.register("interactive_markers", move |ctx, name| {
        let display: Arc<dyn Display> = InteractiveMarkerDisplay::new(
            name,
            ctx.bus.clone(),
            ctx.meshes.clone(),
            InteractiveMarkerDisplayConfig {
                topic_namespace: namespace.clone(),
                ..Default::default()
            },
        );
        display
    });

    registry.register("plot", |ctx, name| {
        let display: Arc<dyn Display> = PlotDisplay::new(name, ctx.bus.clone(), demo_plot_config());
        display
    });

    registry.register("pose_publisher", |ctx, name| {
        let display: Arc<dyn Display> = InteractivePoseDisplay::pose_publisher(
            name,
            &ctx.bus,
            ctx.meshes.clone(),
            PoseDisplayConfig {
                frame: "map".to_string(),
                transform: Pose::from_position(DVec3::new(3.0, 0.0, -2.0)),
                scale: 1.0,
                topic: "goal/pose".to_string(),
            },
        );
        display
    });

    registry.register("point_publisher", |ctx, name| {
        let display: Arc<dyn Display> = InteractivePoseDisplay::point_publisher(
            name,
            &ctx.bus,
            ctx.meshes.clone(),
            PoseDisplayConfig {
                frame: "map".to_string(),
                transform: Pose::from_position(DVec3::new(-3.0, 0.0, -2.0)),
                scale: 0.8,
                topic: "clicked/point".to_string(),
            },
        );
        display
    });

    registry
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let bus = TopicBus::new();
    let meshes: Arc<dyn MeshSource> = Arc::new(PrimitiveMeshes);
    let registry = build_registry(&args.markers);
    let ctx = DisplayContext {
        bus: bus.clone(),
        meshes,
    };

    // Interaction dispatch follows this order, so markers come first.
    let wanted = [
        ("interactive_markers", "markers"),
        ("pose_publisher", "goal"),
        ("point_publisher", "waypoint"),
        ("plot", "signals"),
    ];
    let mut displays = DisplaySet::default();
    for (kind, name) in wanted {
        let Some(display) = registry.create(kind, &ctx, name) else {
            continue;
        };
        display.refresh();
        match kind {
            "plot" => displays.charts.push(display.clone()),
            "interactive_markers" => displays.overlays.push(display.clone()),
            _ => {}
        }
        displays.all.push(display);
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let mut workers = Vec::new();
    if let Some(records) = args.records.clone() {
        workers.push(playback::spawn_playback(bus.clone(), records, shutdown.clone()));
    }
    if !args.no_demo {
        workers.push(demo::spawn_demo(bus.clone(), shutdown.clone()));
    }
    workers.push(spawn_sync_loop(displays.all.clone(), shutdown.clone()));

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("vantage")
            .with_inner_size(winit::dpi::LogicalSize::new(1440, 900))
            .build(&event_loop)?,
    );

    let feedback_topic = format!("{}/feedback", args.markers);
    let mut app = pollster::block_on(App::new(window.clone(), displays, &bus, &feedback_topic))?;

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                if !app.handle_event(&window, &event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::KeyboardInput { event, .. } => {
                            if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                                elwt.exit();
                            }
                        }
                        WindowEvent::RedrawRequested => match app.render(&window) {
                            Ok(()) => {}
                            Err(wgpu::SurfaceError::Lost) => app.resize(app.gfx.size),
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                tracing::error!("GPU out of memory, exiting");
                                elwt.exit();
                            }
                            Err(error) => tracing::warn!(?error, "surface error"),
                        },
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    shutdown.store(true, Ordering::Relaxed);
    for worker in workers {
        let _ = worker.join();
    }
    Ok(())
}
