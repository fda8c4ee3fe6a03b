//! Application state: window events, frame loop and the sync thread.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::Receiver;
use glam::{DVec3, Mat4};
use winit::{event::WindowEvent, window::Window};

use vantage_displays::{Display, MeshSource};
use vantage_msgs::{InteractiveMarkerFeedback, MarkerKind};
use vantage_render::{
    AsyncContext, Interaction, LightBlock, LightKind, MeshRef, PointerPhase, RenderList,
    SyncContext,
};
use vantage_topics::{Subscriber, TopicBus};

use crate::camera::{Camera, CameraController};
use crate::gfx::Gfx;
use crate::paint::EguiPainter;

/// Stand-in for the external mesh/resource system: stable vertex-array
/// handles for the primitive meshes displays reference by kind.
#[derive(Default)]
pub struct PrimitiveMeshes;

impl MeshSource for PrimitiveMeshes {
    fn primitive_mesh(&self, kind: MarkerKind) -> Option<MeshRef> {
        let (vertex_array, element_count) = match kind {
            MarkerKind::Cube => (1, 36),
            MarkerKind::Sphere => (2, 960),
            MarkerKind::Cylinder => (3, 132),
            MarkerKind::Arrow => (4, 168),
        };
        Some(MeshRef {
            vertex_array,
            element_count,
            indexed: true,
        })
    }
}

/// The viewer's displays, grouped by where their 2D output goes.
#[derive(Default, Clone)]
pub struct DisplaySet {
    /// Every display, in sync/async/interaction dispatch order.
    pub all: Vec<Arc<dyn Display>>,
    /// Painted across the whole viewport (marker labels).
    pub overlays: Vec<Arc<dyn Display>>,
    /// Painted into stacked chart panels (plots).
    pub charts: Vec<Arc<dyn Display>>,
}

/// Runs `render_sync` for every display at a fixed cadence until shutdown.
/// Producer callbacks keep running on their own threads; this thread only
/// turns their state into snapshots.
pub fn spawn_sync_loop(
    displays: Vec<Arc<dyn Display>>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("render-sync".to_string())
        .spawn(move || {
            while !shutdown.load(Ordering::Relaxed) {
                let ctx = SyncContext {
                    now_ms: chrono::Utc::now().timestamp_millis(),
                };
                for display in &displays {
                    display.render_sync(&ctx);
                }
                thread::sleep(Duration::from_millis(16));
            }
            tracing::debug!("sync thread stopped");
        })
        .expect("failed to spawn sync thread")
}

#[derive(Debug, Default, Clone, Copy)]
struct FrameStats {
    commands: usize,
    instances: usize,
    materials: usize,
    lights: usize,
    frame_ms: f32,
}

pub struct App {
    pub gfx: Gfx,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    camera: Camera,
    controller: CameraController,
    displays: DisplaySet,
    render_list: RenderList,
    stats: FrameStats,
    feedback_rx: Receiver<InteractiveMarkerFeedback>,
    _feedback_sub: Subscriber<InteractiveMarkerFeedback>,
    feedback_log: VecDeque<String>,
    cursor: Option<(f64, f64)>,
    dragging_marker: bool,
    last_frame: Instant,
}

impl App {
    pub async fn new(
        window: Arc<Window>,
        displays: DisplaySet,
        bus: &TopicBus,
        feedback_topic: &str,
    ) -> Result<Self> {
        let gfx = Gfx::new(window.clone()).await?;
        let size = gfx.size;

        let camera = Camera::new(
            DVec3::new(0.0, 0.5, 0.0),
            8.0,
            Mat4::perspective_rh(
                55f32.to_radians(),
                size.width as f32 / size.height.max(1) as f32,
                0.05,
                2_000.0,
            ),
        );

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &*window,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&gfx.device, gfx.config.format, None, 1);

        // The HUD shows recent feedback; the subscription callback runs on
        // whatever thread releases the drag, so hand the events over through
        // a channel.
        let (feedback_tx, feedback_rx) = crossbeam_channel::bounded(64);
        let feedback_sub = bus.subscribe::<InteractiveMarkerFeedback>(feedback_topic);
        feedback_sub.set_callback(move |fb| {
            let _ = feedback_tx.try_send((*fb).clone());
        });

        Ok(Self {
            gfx,
            egui_ctx,
            egui_state,
            egui_renderer,
            camera,
            controller: CameraController::new(),
            displays,
            render_list: RenderList::new(),
            stats: FrameStats::default(),
            feedback_rx,
            _feedback_sub: feedback_sub,
            feedback_log: VecDeque::new(),
            cursor: None,
            dragging_marker: false,
            last_frame: Instant::now(),
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.gfx.resize(new_size);
            self.camera.proj = Mat4::perspective_rh(
                55f32.to_radians(),
                new_size.width as f32 / new_size.height.max(1) as f32,
                0.05,
                2_000.0,
            );
        }
    }

    /// Routes a window event: egui first, then marker interaction, then the
    /// orbit controller. Returns whether the event was consumed.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(window, event);
        if response.consumed {
            return true;
        }

        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Some((position.x, position.y));
                if self.dragging_marker {
                    self.interact(PointerPhase::Move);
                    return true;
                }
            }
            WindowEvent::MouseInput { button, state, .. }
                if *button == winit::event::MouseButton::Left =>
            {
                match state {
                    winit::event::ElementState::Pressed => {
                        if self.interact(PointerPhase::Begin) {
                            self.dragging_marker = true;
                            return true;
                        }
                    }
                    winit::event::ElementState::Released => {
                        if self.dragging_marker {
                            self.interact(PointerPhase::End);
                            self.dragging_marker = false;
                            self.controller.stop_orbit();
                            return true;
                        }
                    }
                }
            }
            _ => {}
        }

        self.controller.handle_event(event, &mut self.camera);

        if let WindowEvent::Resized(physical_size) = event {
            self.resize(*physical_size);
        }
        false
    }

    fn interact(&mut self, phase: PointerPhase) -> bool {
        let Some(cursor) = self.cursor else {
            return false;
        };
        let ray = self.camera.screen_ray(
            cursor,
            (self.gfx.size.width as f64, self.gfx.size.height as f64),
        );
        let interaction = Interaction::new(phase, ray);
        self.displays
            .all
            .iter()
            .any(|display| display.interact(&interaction))
    }

    pub fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        let frame = self.gfx.surface.get_current_texture()?;
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Async phase: rebuild the frame's draw list from the snapshots.
        self.render_list.clear();
        self.render_list
            .push_light(LightBlock::new(LightKind::Ambient, [0.25, 0.25, 0.28]));
        self.render_list
            .push_light(LightBlock::new(LightKind::Directional, [0.9, 0.88, 0.8]));
        let camera_block = self.camera.block();
        {
            let mut ctx = AsyncContext {
                render_list: &mut self.render_list,
                camera: camera_block,
            };
            for display in &self.displays.all {
                display.render_async(&mut ctx);
            }
        }
        // The list is now ready for the external submission layer; the HUD
        // surfaces its totals.
        let now = Instant::now();
        self.stats = FrameStats {
            commands: self.render_list.commands().len(),
            instances: self.render_list.instances().len(),
            materials: self.render_list.materials().len(),
            lights: self.render_list.lights().len(),
            frame_ms: now.duration_since(self.last_frame).as_secs_f32() * 1000.0,
        };
        self.last_frame = now;

        let egui_input = self.egui_state.take_egui_input(window);
        self.egui_ctx.begin_frame(egui_input);
        self.draw_ui();
        let egui_output = self.egui_ctx.end_frame();
        let shapes = self
            .egui_ctx
            .tessellate(egui_output.shapes, self.egui_ctx.pixels_per_point());

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gfx.config.width, self.gfx.config.height],
            pixels_per_point: self.egui_ctx.pixels_per_point(),
        };

        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });

        for (id, delta) in &egui_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.gfx.device, &self.gfx.queue, *id, delta);
        }
        self.egui_renderer.update_buffers(
            &self.gfx.device,
            &self.gfx.queue,
            &mut encoder,
            &shapes,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("overlay pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.012,
                            g: 0.014,
                            b: 0.022,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.egui_renderer
                .render(&mut render_pass, &shapes, &screen_descriptor);
        }

        for id in &egui_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn draw_ui(&mut self) {
        while let Ok(fb) = self.feedback_rx.try_recv() {
            self.feedback_log.push_front(format!(
                "{}/{} -> ({:.2}, {:.2}, {:.2})",
                fb.marker_name,
                fb.control_name,
                fb.pose.position.x,
                fb.pose.position.y,
                fb.pose.position.z
            ));
            self.feedback_log.truncate(8);
        }

        let ctx = self.egui_ctx.clone();
        let stats = self.stats;
        let camera_block = self.camera.block();

        egui::SidePanel::right("status")
            .default_width(220.0)
            .show(&ctx, |ui| {
                ui.heading("vantage");
                ui.label(format!("frame {:.1} ms", stats.frame_ms));
                ui.separator();
                ui.label(format!("draw commands  {}", stats.commands));
                ui.label(format!("instances      {}", stats.instances));
                ui.label(format!("materials      {}", stats.materials));
                ui.label(format!("lights         {}", stats.lights));
                ui.separator();
                ui.label("feedback");
                if self.feedback_log.is_empty() {
                    ui.weak("drag a marker and release");
                }
                for line in &self.feedback_log {
                    ui.monospace(line);
                }
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(&ctx, |ui| {
                let full = ui.max_rect();

                for display in &self.displays.overlays {
                    let mut painter = EguiPainter::new(ui.painter(), full);
                    display.paint(&mut painter, &camera_block);
                }

                // Chart panels stack upward from the bottom-left corner.
                let chart_width = (full.width() * 0.45).clamp(240.0, 520.0);
                let chart_height = 200.0;
                for (index, display) in self.displays.charts.iter().enumerate() {
                    let bottom = full.max.y - 8.0 - index as f32 * (chart_height + 8.0);
                    let rect = egui::Rect::from_min_max(
                        egui::pos2(full.min.x + 8.0, bottom - chart_height),
                        egui::pos2(full.min.x + 8.0 + chart_width, bottom),
                    );
                    if rect.min.y < full.min.y {
                        break;
                    }
                    let mut painter = EguiPainter::new(ui.painter(), rect);
                    display.paint(&mut painter, &camera_block);
                }
            });
    }
}
