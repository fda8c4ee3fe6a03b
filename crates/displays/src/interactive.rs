//! Interactive markers: remotely-defined, user-draggable 3D widgets.
//!
//! Ownership flows strictly downward: an array owns markers, a marker owns
//! its controls; back-references upward are `Weak`. Network callbacks mutate
//! the array on the producer thread under its mutex; `render_sync` copies
//! the current state into a [`MarkerScene`] snapshot that the render and
//! paint threads read lock-free. Pointer interaction travels array → marker
//! → control, feedback travels back up and out through the registered
//! handler.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use glam::{DMat4, DQuat, DVec2, DVec3};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use vantage_msgs::{
    ColorRgba, InteractionMode, InteractiveMarkerFeedback, InteractiveMarkerInit,
    InteractiveMarkerUpdate, Marker, MarkerKind, Pose, PointStamped, PoseStamped,
};
use vantage_render::{
    AsyncContext, Interaction, PointerPhase, Ray, SceneNode, Snapshot, SyncContext,
};
use vantage_topics::{TopicBus, Watcher};

use crate::marker::{push_primitives, MeshSource, PrimitiveInstance};
use crate::paint::{project, Painter, TextAnchor};
use crate::Display;

/// Presentation parameters shared by an array and all its markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveMarkerParams {
    pub show_descriptions: bool,
    pub description_size: f64,
    pub description_offset: DVec2,
    pub description_color: ColorRgba,
    pub description_opacity: f64,
}

impl Default for InteractiveMarkerParams {
    fn default() -> Self {
        Self {
            show_descriptions: true,
            description_size: 0.2,
            description_offset: DVec2::new(0.0, 0.85),
            description_color: ColorRgba::WHITE,
            description_opacity: 1.0,
        }
    }
}

/// Snapshot of a whole marker set, published each sync pass.
#[derive(Default)]
pub struct MarkerScene {
    pub primitives: Vec<PrimitiveInstance>,
    pub labels: Vec<MarkerLabel>,
}

/// Description billboard, painted as a 2D overlay by the paint phase.
pub struct MarkerLabel {
    pub text: String,
    pub anchor: DVec3,
    pub size: f64,
    pub color: ColorRgba,
}

fn sane_quat(q: DQuat) -> DQuat {
    if q.length_squared() < 1e-12 {
        DQuat::IDENTITY
    } else {
        q.normalize()
    }
}

/// Captured at pointer-down; drag math is computed relative to it.
#[derive(Debug, Clone, Copy)]
struct DragBegin {
    ray: Ray,
    pose: Pose,
    depth: f64,
}

pub struct InteractiveMarkerControl {
    name: String,
    mode: InteractionMode,
    orientation: DQuat,
    markers: Vec<Marker>,
    parent: Weak<InteractiveMarker>,
}

impl InteractiveMarkerControl {
    fn from_message(
        message: &vantage_msgs::InteractiveMarkerControl,
        parent: Weak<InteractiveMarker>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: message.name.clone(),
            mode: InteractionMode::from_wire(message.interaction_mode),
            orientation: sane_quat(message.orientation),
            markers: message.markers.clone(),
            parent,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn parent_marker(&self) -> Option<Arc<InteractiveMarker>> {
        self.parent.upgrade()
    }

    /// Local frame of this control's primitives within the world.
    fn frame(&self, pose: &Pose, scale: f64) -> DMat4 {
        pose.to_matrix()
            * DMat4::from_quat(self.orientation)
            * DMat4::from_scale(DVec3::splat(scale))
    }

    /// Nearest intersection of `ray` with this control's primitives, as a
    /// distance along the ray. Non-interactive controls never hit. Rotation
    /// rings are tested as an annulus in their rotation plane so they don't
    /// swallow clicks aimed through their hole.
    fn hit(&self, ray: &Ray, pose: &Pose, scale: f64) -> Option<f64> {
        if self.mode == InteractionMode::None {
            return None;
        }
        let frame = self.frame(pose, scale);
        let ring = matches!(
            self.mode,
            InteractionMode::RotateAxis | InteractionMode::MoveRotate
        );
        let axis = (pose.orientation * self.orientation) * DVec3::X;
        let mut nearest: Option<f64> = None;
        for marker in &self.markers {
            let center = frame.transform_point3(marker.pose.position);
            let t = if ring {
                let radius = 0.5 * marker.scale.x.max(marker.scale.y) * scale;
                ray.intersect_plane(center, axis).and_then(|hit| {
                    let lever = (hit - center).length();
                    (lever >= 0.7 * radius && lever <= 1.15 * radius)
                        .then(|| (hit - ray.origin).length())
                })
            } else {
                let radius = 0.5 * marker.scale.max_element() * scale;
                ray.intersect_sphere(center, radius)
            };
            if let Some(t) = t {
                if nearest.map(|n| t < n).unwrap_or(true) {
                    nearest = Some(t);
                }
            }
        }
        nearest
    }

    /// Pose resulting from dragging this control from `begin` to `ray`.
    /// Degenerate geometry (parallel rays, zero-length levers) keeps the
    /// begin pose.
    fn dragged_pose(&self, begin: &DragBegin, ray: &Ray) -> Pose {
        let start = begin.pose;
        let axis = (start.orientation * self.orientation) * DVec3::X;
        let anchor = start.position;
        match self.mode {
            InteractionMode::MoveAxis => {
                let s0 = begin.ray.closest_line_param(anchor, axis);
                let s1 = ray.closest_line_param(anchor, axis);
                match (s0, s1) {
                    (Some(s0), Some(s1)) => Pose {
                        position: anchor + axis * (s1 - s0),
                        orientation: start.orientation,
                    },
                    _ => start,
                }
            }
            InteractionMode::MovePlane => {
                let h0 = begin.ray.intersect_plane(anchor, axis);
                let h1 = ray.intersect_plane(anchor, axis);
                match (h0, h1) {
                    (Some(h0), Some(h1)) => Pose {
                        position: anchor + (h1 - h0),
                        orientation: start.orientation,
                    },
                    _ => start,
                }
            }
            InteractionMode::RotateAxis => match self.lever_vectors(begin, ray, anchor, axis) {
                Some((v0, v1)) => {
                    let angle = axis.dot(v0.cross(v1)).atan2(v0.dot(v1));
                    Pose {
                        position: anchor,
                        orientation: DQuat::from_axis_angle(axis, angle) * start.orientation,
                    }
                }
                None => start,
            },
            InteractionMode::MoveRotate => match self.lever_vectors(begin, ray, anchor, axis) {
                Some((v0, v1)) => {
                    let angle = axis.dot(v0.cross(v1)).atan2(v0.dot(v1));
                    let radial = v1.normalize() * (v1.length() - v0.length());
                    Pose {
                        position: anchor + radial,
                        orientation: DQuat::from_axis_angle(axis, angle) * start.orientation,
                    }
                }
                None => start,
            },
            InteractionMode::Move3d => Pose {
                position: start.position
                    + (ray.point_at(begin.depth) - begin.ray.point_at(begin.depth)),
                orientation: start.orientation,
            },
            InteractionMode::Rotate3d => {
                let v0 = begin.ray.point_at(begin.depth) - anchor;
                let v1 = ray.point_at(begin.depth) - anchor;
                if v0.length_squared() < 1e-12 || v1.length_squared() < 1e-12 {
                    return start;
                }
                Pose {
                    position: anchor,
                    orientation: DQuat::from_rotation_arc(v0.normalize(), v1.normalize())
                        * start.orientation,
                }
            }
            InteractionMode::Menu | InteractionMode::None => start,
        }
    }

    /// Begin/current lever arms in the control's rotation plane.
    fn lever_vectors(
        &self,
        begin: &DragBegin,
        ray: &Ray,
        anchor: DVec3,
        axis: DVec3,
    ) -> Option<(DVec3, DVec3)> {
        let h0 = begin.ray.intersect_plane(anchor, axis)?;
        let h1 = ray.intersect_plane(anchor, axis)?;
        let v0 = h0 - anchor;
        let v1 = h1 - anchor;
        (v0.length_squared() > 1e-12 && v1.length_squared() > 1e-12).then_some((v0, v1))
    }

    fn emit_feedback(&self, pose: Pose) {
        if let Some(marker) = self.parent.upgrade() {
            marker.forward_feedback(&self.name, pose);
        }
    }
}

struct MarkerState {
    pose: Pose,
    dragged: bool,
    drag: Option<DragState>,
}

struct DragState {
    control: usize,
    begin: DragBegin,
}

pub struct InteractiveMarker {
    name: String,
    description: String,
    scale: f64,
    controls: Vec<Arc<InteractiveMarkerControl>>,
    state: Mutex<MarkerState>,
    params: Arc<RwLock<InteractiveMarkerParams>>,
    parent: Weak<InteractiveMarkerArray>,
}

impl InteractiveMarker {
    fn from_message(
        message: &vantage_msgs::InteractiveMarker,
        params: Arc<RwLock<InteractiveMarkerParams>>,
        parent: Weak<InteractiveMarkerArray>,
    ) -> Arc<Self> {
        let scale = if message.scale > 0.0 {
            message.scale
        } else {
            tracing::debug!(marker = %message.name, "non-positive marker scale, using 1");
            1.0
        };
        Arc::new_cyclic(|weak_self: &Weak<Self>| Self {
            name: message.name.clone(),
            description: message.description.clone(),
            scale,
            controls: message
                .controls
                .iter()
                .map(|c| InteractiveMarkerControl::from_message(c, weak_self.clone()))
                .collect(),
            state: Mutex::new(MarkerState {
                pose: message.pose,
                dragged: false,
                drag: None,
            }),
            params,
            parent,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn controls(&self) -> &[Arc<InteractiveMarkerControl>] {
        &self.controls
    }

    pub fn parent_array(&self) -> Option<Arc<InteractiveMarkerArray>> {
        self.parent.upgrade()
    }

    pub fn pose(&self) -> Pose {
        self.state.lock().pose
    }

    pub fn is_dragged(&self) -> bool {
        self.state.lock().dragged
    }

    /// Applies an external pose update. Ignored while the user drags this
    /// marker; the drag stays authoritative until release.
    pub fn set_pose(&self, pose: Pose) {
        let mut state = self.state.lock();
        if !state.dragged {
            state.pose = pose;
        }
    }

    /// Best hit over all controls: nearest along the ray, ties resolved by
    /// control insertion order.
    fn hit(&self, ray: &Ray) -> Option<(usize, f64)> {
        let pose = self.pose();
        let mut best: Option<(usize, f64)> = None;
        for (index, control) in self.controls.iter().enumerate() {
            if let Some(t) = control.hit(ray, &pose, self.scale) {
                if best.map(|(_, bt)| t < bt).unwrap_or(true) {
                    best = Some((index, t));
                }
            }
        }
        best
    }

    fn begin_drag(&self, control: usize, depth: f64, ray: Ray) {
        let mut state = self.state.lock();
        let begin = DragBegin {
            ray,
            pose: state.pose,
            depth,
        };
        state.dragged = true;
        state.drag = Some(DragState { control, begin });
    }

    fn drag_move(&self, ray: &Ray) {
        let mut state = self.state.lock();
        if let Some(drag) = &state.drag {
            let pose = self.controls[drag.control].dragged_pose(&drag.begin, ray);
            state.pose = pose;
        }
    }

    /// Applies the final pose, clears the dragged flag and sends feedback up
    /// through the control.
    fn end_drag(&self, ray: &Ray) {
        let finished = {
            let mut state = self.state.lock();
            state.dragged = false;
            state.drag.take().map(|drag| {
                let pose = self.controls[drag.control].dragged_pose(&drag.begin, ray);
                state.pose = pose;
                (drag.control, pose)
            })
        };
        if let Some((control, pose)) = finished {
            self.controls[control].emit_feedback(pose);
        }
    }

    fn forward_feedback(&self, control_name: &str, pose: Pose) {
        if let Some(array) = self.parent.upgrade() {
            array.emit_feedback(InteractiveMarkerFeedback {
                marker_name: self.name.clone(),
                control_name: control_name.to_string(),
                frame: String::new(),
                pose,
            });
        }
    }

    /// Copies this marker's current visual state into the scene snapshot.
    fn sync_into(&self, scene: &mut MarkerScene) {
        let pose = self.pose();
        for control in &self.controls {
            let frame = control.frame(&pose, self.scale);
            for marker in &control.markers {
                scene.primitives.push(PrimitiveInstance::resolve(frame, marker));
            }
        }
        let params = self.params.read().clone();
        if params.show_descriptions && !self.description.is_empty() {
            let offset = params.description_offset * self.scale;
            scene.labels.push(MarkerLabel {
                text: self.description.clone(),
                anchor: pose.position + DVec3::new(offset.x, offset.y, 0.0),
                size: params.description_size * self.scale,
                color: params
                    .description_color
                    .with_alpha((params.description_color.a as f64 * params.description_opacity) as f32),
            });
        }
    }
}

type FeedbackHandler = Box<dyn Fn(InteractiveMarkerFeedback) + Send + Sync>;

/// Owns a server's marker set and routes interaction and feedback.
pub struct InteractiveMarkerArray {
    params: Arc<RwLock<InteractiveMarkerParams>>,
    meshes: Arc<dyn MeshSource>,
    markers: Mutex<BTreeMap<String, Arc<InteractiveMarker>>>,
    feedback: Mutex<Option<FeedbackHandler>>,
    scene: Snapshot<MarkerScene>,
}

impl InteractiveMarkerArray {
    pub fn new(params: InteractiveMarkerParams, meshes: Arc<dyn MeshSource>) -> Arc<Self> {
        Arc::new(Self {
            params: Arc::new(RwLock::new(params)),
            meshes,
            markers: Mutex::new(BTreeMap::new()),
            feedback: Mutex::new(None),
            scene: Snapshot::new(),
        })
    }

    pub fn set_params(&self, params: InteractiveMarkerParams) {
        *self.params.write() = params;
    }

    pub fn set_feedback_handler(
        &self,
        handler: impl Fn(InteractiveMarkerFeedback) + Send + Sync + 'static,
    ) {
        *self.feedback.lock() = Some(Box::new(handler));
    }

    /// Full replace: every prior marker is removed, even if its name
    /// reappears — fresh objects are constructed for the whole set.
    pub fn init(self: &Arc<Self>, message: &InteractiveMarkerInit) {
        let fresh: BTreeMap<String, Arc<InteractiveMarker>> = message
            .markers
            .iter()
            .map(|m| {
                (
                    m.name.clone(),
                    InteractiveMarker::from_message(m, self.params.clone(), Arc::downgrade(self)),
                )
            })
            .collect();
        *self.markers.lock() = fresh;
    }

    /// Incremental upsert/pose/erase. Erasing an unknown name is a no-op.
    pub fn update(self: &Arc<Self>, message: &InteractiveMarkerUpdate) {
        let mut markers = self.markers.lock();
        for m in &message.markers {
            markers.insert(
                m.name.clone(),
                InteractiveMarker::from_message(m, self.params.clone(), Arc::downgrade(self)),
            );
        }
        for p in &message.poses {
            if let Some(marker) = markers.get(&p.name) {
                marker.set_pose(p.pose);
            }
        }
        for name in &message.erases {
            markers.remove(name);
        }
    }

    /// Shared handle to a marker; clone before releasing interest in the
    /// map, entries may be erased by a later update.
    pub fn marker(&self, name: &str) -> Option<Arc<InteractiveMarker>> {
        self.markers.lock().get(name).cloned()
    }

    pub fn marker_names(&self) -> Vec<String> {
        self.markers.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.markers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.lock().is_empty()
    }

    /// Last published scene snapshot (async side).
    pub fn scene(&self) -> Arc<MarkerScene> {
        self.scene.read()
    }

    fn emit_feedback(&self, feedback: InteractiveMarkerFeedback) {
        if let Some(handler) = &*self.feedback.lock() {
            handler(feedback);
        }
    }

    fn snapshot_markers(&self) -> Vec<Arc<InteractiveMarker>> {
        self.markers.lock().values().cloned().collect()
    }

    fn dragged_marker(&self) -> Option<Arc<InteractiveMarker>> {
        self.markers
            .lock()
            .values()
            .find(|m| m.is_dragged())
            .cloned()
    }
}

impl SceneNode for InteractiveMarkerArray {
    fn render_sync(&self, _ctx: &SyncContext) {
        let markers = self.snapshot_markers();
        let mut scene = MarkerScene::default();
        for marker in &markers {
            marker.sync_into(&mut scene);
        }
        self.scene.publish(scene);
    }

    fn render_async(&self, ctx: &mut AsyncContext<'_>) {
        let scene = self.scene.read();
        push_primitives(&scene.primitives, &*self.meshes, ctx.render_list);
    }

    fn interact(&self, interaction: &Interaction) -> bool {
        match interaction.phase {
            PointerPhase::Begin => {
                let markers = self.snapshot_markers();
                let mut best: Option<(Arc<InteractiveMarker>, usize, f64)> = None;
                for marker in markers {
                    if let Some((control, t)) = marker.hit(&interaction.ray) {
                        if best.as_ref().map(|(_, _, bt)| t < *bt).unwrap_or(true) {
                            best = Some((marker, control, t));
                        }
                    }
                }
                match best {
                    Some((marker, control, t)) => {
                        marker.begin_drag(control, t, interaction.ray);
                        true
                    }
                    None => false,
                }
            }
            PointerPhase::Move => match self.dragged_marker() {
                Some(marker) => {
                    marker.drag_move(&interaction.ray);
                    true
                }
                None => false,
            },
            PointerPhase::End => match self.dragged_marker() {
                Some(marker) => {
                    marker.end_drag(&interaction.ray);
                    true
                }
                None => false,
            },
        }
    }
}

/// Display configuration persisted for an interactive-marker display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveMarkerDisplayConfig {
    pub topic_namespace: String,
    pub show_descriptions: bool,
    pub description_size: f64,
    pub description_offset: DVec2,
    pub description_color: ColorRgba,
    pub description_opacity: f64,
}

impl Default for InteractiveMarkerDisplayConfig {
    fn default() -> Self {
        let params = InteractiveMarkerParams::default();
        Self {
            topic_namespace: String::new(),
            show_descriptions: params.show_descriptions,
            description_size: params.description_size,
            description_offset: params.description_offset,
            description_color: params.description_color,
            description_opacity: params.description_opacity,
        }
    }
}

impl InteractiveMarkerDisplayConfig {
    fn params(&self) -> InteractiveMarkerParams {
        InteractiveMarkerParams {
            show_descriptions: self.show_descriptions,
            description_size: self.description_size,
            description_offset: self.description_offset,
            description_color: self.description_color,
            description_opacity: self.description_opacity,
        }
    }
}

struct MarkerChannels {
    namespace: String,
    _init: vantage_topics::Subscriber<InteractiveMarkerInit>,
    _update: vantage_topics::Subscriber<InteractiveMarkerUpdate>,
}

/// Adapter between a topic namespace and one [`InteractiveMarkerArray`].
///
/// Subscribes to `<ns>/init` and `<ns>/update`, applies messages on the
/// publishing thread, and publishes user feedback on `<ns>/feedback`.
pub struct InteractiveMarkerDisplay {
    name: String,
    bus: Arc<TopicBus>,
    config: Mutex<InteractiveMarkerDisplayConfig>,
    array: Arc<InteractiveMarkerArray>,
    channels: Mutex<Option<MarkerChannels>>,
}

impl InteractiveMarkerDisplay {
    pub fn new(
        name: &str,
        bus: Arc<TopicBus>,
        meshes: Arc<dyn MeshSource>,
        config: InteractiveMarkerDisplayConfig,
    ) -> Arc<Self> {
        let array = InteractiveMarkerArray::new(config.params(), meshes);
        Arc::new(Self {
            name: name.to_string(),
            bus,
            config: Mutex::new(config),
            array,
            channels: Mutex::new(None),
        })
    }

    pub fn config(&self) -> InteractiveMarkerDisplayConfig {
        self.config.lock().clone()
    }

    pub fn set_config(&self, config: InteractiveMarkerDisplayConfig) {
        *self.config.lock() = config;
    }

    pub fn array(&self) -> &Arc<InteractiveMarkerArray> {
        &self.array
    }

    fn resubscribe(&self, namespace: &str) {
        let mut channels = self.channels.lock();
        *channels = None;
        if namespace.is_empty() {
            return;
        }

        let init_sub = self
            .bus
            .subscribe::<InteractiveMarkerInit>(&format!("{namespace}/init"));
        let update_sub = self
            .bus
            .subscribe::<InteractiveMarkerUpdate>(&format!("{namespace}/update"));

        let array = self.array.clone();
        init_sub.set_callback(move |message| array.init(&message));
        let array = self.array.clone();
        update_sub.set_callback(move |message| array.update(&message));

        // Catch up on retained messages instead of waiting for the next
        // publish.
        if let Some(message) = init_sub.latest() {
            self.array.init(&message);
        }
        if let Some(message) = update_sub.latest() {
            self.array.update(&message);
        }

        let publisher = self
            .bus
            .advertise::<InteractiveMarkerFeedback>(&format!("{namespace}/feedback"));
        self.array
            .set_feedback_handler(move |feedback| publisher.publish(feedback));

        tracing::info!(namespace, "subscribed to interactive marker topics");
        *channels = Some(MarkerChannels {
            namespace: namespace.to_string(),
            _init: init_sub,
            _update: update_sub,
        });
    }
}

impl SceneNode for InteractiveMarkerDisplay {
    fn render_sync(&self, ctx: &SyncContext) {
        let config = self.config.lock().clone();
        self.array.set_params(config.params());

        let current = self
            .channels
            .lock()
            .as_ref()
            .map(|c| c.namespace.clone())
            .unwrap_or_default();
        if current != config.topic_namespace {
            self.resubscribe(&config.topic_namespace);
        }

        self.array.render_sync(ctx);
    }

    fn render_async(&self, ctx: &mut AsyncContext<'_>) {
        self.array.render_async(ctx);
    }

    fn interact(&self, interaction: &Interaction) -> bool {
        self.array.interact(interaction)
    }
}

impl Display for InteractiveMarkerDisplay {
    fn name(&self) -> &str {
        &self.name
    }

    fn paint(&self, painter: &mut dyn Painter, camera: &vantage_render::CameraBlock) {
        paint_labels(&self.array, painter, camera);
    }
}

fn paint_labels(
    array: &InteractiveMarkerArray,
    painter: &mut dyn Painter,
    camera: &vantage_render::CameraBlock,
) {
    let scene = array.scene();
    let viewport = painter.extent();
    for label in &scene.labels {
        let Some(base) = project(camera, viewport, label.anchor) else {
            continue;
        };
        // Perspective-scale the font by projecting the label's world height.
        let size = match project(camera, viewport, label.anchor + DVec3::Y * label.size) {
            Some(top) => (base.y - top.y).abs().clamp(9.0, 48.0),
            None => 14.0,
        };
        painter.text(base, TextAnchor::CenterBottom, &label.text, size, label.color);
    }
}

/// Configuration of a pose-publishing display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseDisplayConfig {
    pub frame: String,
    pub transform: Pose,
    pub scale: f64,
    pub topic: String,
}

impl Default for PoseDisplayConfig {
    fn default() -> Self {
        Self {
            frame: String::new(),
            transform: Pose::IDENTITY,
            scale: 1.0,
            topic: String::new(),
        }
    }
}

const POSE_MARKER_NAME: &str = "pose";

/// A display wrapping one self-constructed interactive marker that
/// represents a single pose. Dragging updates the transform; releasing
/// invokes the publish hook exactly once with the final pose.
///
/// The two message flavors (point-only and full pose) are picked by the
/// constructor; see [`InteractivePoseDisplay::point_publisher`] and
/// [`InteractivePoseDisplay::pose_publisher`].
pub struct InteractivePoseDisplay {
    name: String,
    config: Mutex<PoseDisplayConfig>,
    array: Arc<InteractiveMarkerArray>,
    scale_watch: Mutex<Watcher<f64>>,
    publish: Box<dyn Fn(&str, &Pose) + Send + Sync>,
}

impl InteractivePoseDisplay {
    pub fn new(
        name: &str,
        meshes: Arc<dyn MeshSource>,
        config: PoseDisplayConfig,
        publish: impl Fn(&str, &Pose) + Send + Sync + 'static,
    ) -> Arc<Self> {
        let params = InteractiveMarkerParams {
            show_descriptions: false,
            ..Default::default()
        };
        let array = InteractiveMarkerArray::new(params, meshes);
        array.init(&pose_marker_init(config.transform, config.scale));

        let mut scale_watch = Watcher::new();
        scale_watch.changed(config.scale);

        let this = Arc::new(Self {
            name: name.to_string(),
            config: Mutex::new(config),
            array: array.clone(),
            scale_watch: Mutex::new(scale_watch),
            publish: Box::new(publish),
        });

        let weak = Arc::downgrade(&this);
        array.set_feedback_handler(move |feedback| {
            if let Some(display) = weak.upgrade() {
                display.on_feedback(feedback);
            }
        });
        this
    }

    /// Publishes a [`PointStamped`] (position only) on drag release.
    pub fn point_publisher(
        name: &str,
        bus: &TopicBus,
        meshes: Arc<dyn MeshSource>,
        config: PoseDisplayConfig,
    ) -> Arc<Self> {
        let publisher = bus.advertise::<PointStamped>(&config.topic);
        Self::new(name, meshes, config, move |frame, pose| {
            publisher.publish(PointStamped {
                frame: frame.to_string(),
                point: pose.position,
            });
        })
    }

    /// Publishes a full [`PoseStamped`] on drag release.
    pub fn pose_publisher(
        name: &str,
        bus: &TopicBus,
        meshes: Arc<dyn MeshSource>,
        config: PoseDisplayConfig,
    ) -> Arc<Self> {
        let publisher = bus.advertise::<PoseStamped>(&config.topic);
        Self::new(name, meshes, config, move |frame, pose| {
            publisher.publish(PoseStamped {
                frame: frame.to_string(),
                pose: *pose,
            });
        })
    }

    pub fn config(&self) -> PoseDisplayConfig {
        self.config.lock().clone()
    }

    pub fn set_config(&self, config: PoseDisplayConfig) {
        *self.config.lock() = config;
    }

    fn on_feedback(&self, feedback: InteractiveMarkerFeedback) {
        let frame = {
            let mut config = self.config.lock();
            config.transform = feedback.pose;
            config.frame.clone()
        };
        (self.publish)(&frame, &feedback.pose);
    }
}

impl SceneNode for InteractivePoseDisplay {
    fn render_sync(&self, ctx: &SyncContext) {
        let config = self.config.lock().clone();
        match self.array.marker(POSE_MARKER_NAME) {
            Some(marker) => {
                if marker.is_dragged() {
                    // Track the live pose in the transform property.
                    self.config.lock().transform = marker.pose();
                } else if self.scale_watch.lock().changed(config.scale) {
                    self.array
                        .init(&pose_marker_init(config.transform, config.scale));
                } else {
                    marker.set_pose(config.transform);
                }
            }
            None => self
                .array
                .init(&pose_marker_init(config.transform, config.scale)),
        }
        self.array.render_sync(ctx);
    }

    fn render_async(&self, ctx: &mut AsyncContext<'_>) {
        self.array.render_async(ctx);
    }

    fn interact(&self, interaction: &Interaction) -> bool {
        self.array.interact(interaction)
    }
}

impl Display for InteractivePoseDisplay {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Builds the 6-DOF widget: a grab sphere, three move arrows and three
/// rotate rings, colored per axis.
fn pose_marker_init(pose: Pose, scale: f64) -> InteractiveMarkerInit {
    let axes = [
        (DQuat::IDENTITY, ColorRgba::new(0.9, 0.2, 0.2, 1.0), "x"),
        (
            DQuat::from_axis_angle(DVec3::Z, std::f64::consts::FRAC_PI_2),
            ColorRgba::new(0.2, 0.9, 0.2, 1.0),
            "y",
        ),
        (
            DQuat::from_axis_angle(DVec3::Y, -std::f64::consts::FRAC_PI_2),
            ColorRgba::new(0.2, 0.2, 0.9, 1.0),
            "z",
        ),
    ];

    let mut controls = vec![vantage_msgs::InteractiveMarkerControl {
        name: "center".to_string(),
        interaction_mode: InteractionMode::Move3d.to_wire(),
        orientation: DQuat::IDENTITY,
        markers: vec![Marker {
            kind: MarkerKind::Sphere,
            pose: Pose::IDENTITY,
            scale: DVec3::splat(0.25),
            color: ColorRgba::new(0.8, 0.8, 0.8, 1.0),
        }],
    }];

    for (orientation, color, axis) in axes {
        controls.push(vantage_msgs::InteractiveMarkerControl {
            name: format!("move_{axis}"),
            interaction_mode: InteractionMode::MoveAxis.to_wire(),
            orientation,
            markers: vec![Marker {
                kind: MarkerKind::Arrow,
                pose: Pose::from_position(DVec3::new(0.5, 0.0, 0.0)),
                scale: DVec3::new(0.7, 0.15, 0.15),
                color,
            }],
        });
        controls.push(vantage_msgs::InteractiveMarkerControl {
            name: format!("rotate_{axis}"),
            interaction_mode: InteractionMode::RotateAxis.to_wire(),
            orientation,
            markers: vec![Marker {
                kind: MarkerKind::Cylinder,
                pose: Pose {
                    position: DVec3::ZERO,
                    // Cylinder axis (z) aligned with the control's x axis.
                    orientation: DQuat::from_axis_angle(DVec3::Y, std::f64::consts::FRAC_PI_2),
                },
                scale: DVec3::new(0.9, 0.9, 0.05),
                color: color.with_alpha(0.6),
            }],
        });
    }

    InteractiveMarkerInit {
        markers: vec![vantage_msgs::InteractiveMarker {
            name: POSE_MARKER_NAME.to_string(),
            description: String::new(),
            pose,
            scale,
            controls,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_msgs::InteractiveMarkerPose;
    use vantage_render::MeshRef;

    struct AllMeshes;

    impl MeshSource for AllMeshes {
        fn primitive_mesh(&self, kind: MarkerKind) -> Option<MeshRef> {
            Some(MeshRef {
                vertex_array: kind as u32 + 1,
                element_count: 36,
                indexed: true,
            })
        }
    }

    fn sphere_control(mode: InteractionMode) -> vantage_msgs::InteractiveMarkerControl {
        vantage_msgs::InteractiveMarkerControl {
            name: "grab".to_string(),
            interaction_mode: mode.to_wire(),
            orientation: DQuat::IDENTITY,
            markers: vec![Marker {
                kind: MarkerKind::Sphere,
                pose: Pose::IDENTITY,
                scale: DVec3::ONE,
                color: ColorRgba::WHITE,
            }],
        }
    }

    fn simple_marker(name: &str, mode: InteractionMode) -> vantage_msgs::InteractiveMarker {
        vantage_msgs::InteractiveMarker {
            name: name.to_string(),
            description: format!("{name} description"),
            pose: Pose::IDENTITY,
            scale: 1.0,
            controls: vec![sphere_control(mode)],
        }
    }

    fn array() -> Arc<InteractiveMarkerArray> {
        InteractiveMarkerArray::new(InteractiveMarkerParams::default(), Arc::new(AllMeshes))
    }

    fn init_msg(names: &[&str]) -> InteractiveMarkerInit {
        InteractiveMarkerInit {
            markers: names
                .iter()
                .map(|n| simple_marker(n, InteractionMode::Move3d))
                .collect(),
        }
    }

    #[test]
    fn init_fully_replaces_the_marker_set() {
        let array = array();
        array.init(&init_msg(&["a", "b"]));
        let b_before = array.marker("b").unwrap();

        array.init(&init_msg(&["b", "c"]));
        assert_eq!(array.marker_names(), vec!["b".to_string(), "c".to_string()]);
        // Fresh construction, not identity-stable across inits.
        let b_after = array.marker("b").unwrap();
        assert!(!Arc::ptr_eq(&b_before, &b_after));
    }

    #[test]
    fn update_is_incremental() {
        let array = array();
        array.init(&init_msg(&["a"]));

        array.update(&InteractiveMarkerUpdate {
            markers: vec![simple_marker("b", InteractionMode::Move3d)],
            ..Default::default()
        });
        assert_eq!(array.marker_names(), vec!["a".to_string(), "b".to_string()]);

        array.update(&InteractiveMarkerUpdate {
            erases: vec!["a".to_string()],
            ..Default::default()
        });
        assert_eq!(array.marker_names(), vec!["b".to_string()]);

        // Unknown erase is a no-op.
        array.update(&InteractiveMarkerUpdate {
            erases: vec!["zz".to_string()],
            ..Default::default()
        });
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn pose_update_moves_without_touching_controls() {
        let array = array();
        array.init(&init_msg(&["a"]));
        let marker = array.marker("a").unwrap();
        let controls_before = marker.controls()[0].clone();

        array.update(&InteractiveMarkerUpdate {
            poses: vec![InteractiveMarkerPose {
                name: "a".to_string(),
                pose: Pose::from_position(DVec3::new(5.0, 0.0, 0.0)),
            }],
            ..Default::default()
        });

        let marker = array.marker("a").unwrap();
        assert_eq!(marker.pose().position, DVec3::new(5.0, 0.0, 0.0));
        assert!(Arc::ptr_eq(&controls_before, &marker.controls()[0]));
    }

    fn ray_towards_origin_from(origin: DVec3) -> Ray {
        Ray::new(origin, -origin)
    }

    #[test]
    fn drag_publishes_exactly_one_feedback_on_release() {
        let array = array();
        array.init(&init_msg(&["a"]));
        let received: Arc<Mutex<Vec<InteractiveMarkerFeedback>>> =
            Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        array.set_feedback_handler(move |fb| sink.lock().push(fb));

        // Press on the sphere, drag sideways, release.
        let begin = Interaction::new(
            PointerPhase::Begin,
            ray_towards_origin_from(DVec3::new(0.0, 0.0, 10.0)),
        );
        assert!(array.interact(&begin));
        assert!(array.marker("a").unwrap().is_dragged());

        let sideways = Ray::new(DVec3::new(2.0, 0.0, 10.0), -DVec3::Z);
        assert!(array.interact(&Interaction::new(PointerPhase::Move, sideways)));
        assert!(received.lock().is_empty());

        assert!(array.interact(&Interaction::new(PointerPhase::End, sideways)));
        assert!(!array.marker("a").unwrap().is_dragged());

        let feedback = received.lock();
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].marker_name, "a");
        assert_eq!(feedback[0].control_name, "grab");
        // Move3d keeps depth: the marker followed the ray sideways.
        assert!((feedback[0].pose.position.x - 2.0).abs() < 1e-6);
    }

    #[test]
    fn incoming_pose_updates_are_ignored_while_dragged() {
        let array = array();
        array.init(&init_msg(&["a"]));
        array.interact(&Interaction::new(
            PointerPhase::Begin,
            ray_towards_origin_from(DVec3::new(0.0, 0.0, 10.0)),
        ));

        array.update(&InteractiveMarkerUpdate {
            poses: vec![InteractiveMarkerPose {
                name: "a".to_string(),
                pose: Pose::from_position(DVec3::new(100.0, 0.0, 0.0)),
            }],
            ..Default::default()
        });
        assert!(array.marker("a").unwrap().pose().position.length() < 1.0);
    }

    #[test]
    fn none_mode_controls_never_consume() {
        let array = array();
        array.init(&InteractiveMarkerInit {
            markers: vec![simple_marker("a", InteractionMode::None)],
        });
        let begin = Interaction::new(
            PointerPhase::Begin,
            ray_towards_origin_from(DVec3::new(0.0, 0.0, 10.0)),
        );
        assert!(!array.interact(&begin));
    }

    #[test]
    fn malformed_interaction_mode_degrades_to_none() {
        let array = array();
        let mut marker = simple_marker("a", InteractionMode::Move3d);
        marker.controls[0].interaction_mode = 250;
        array.init(&InteractiveMarkerInit { markers: vec![marker] });
        assert_eq!(
            array.marker("a").unwrap().controls()[0].mode(),
            InteractionMode::None
        );
    }

    #[test]
    fn nearest_control_wins_pointer_down() {
        // Two markers on the ray; the closer one must take the event.
        let near = vantage_msgs::InteractiveMarker {
            pose: Pose::from_position(DVec3::new(0.0, 0.0, 5.0)),
            ..simple_marker("near", InteractionMode::Move3d)
        };
        let far = simple_marker("far", InteractionMode::Move3d);
        let array = array();
        array.init(&InteractiveMarkerInit {
            markers: vec![far, near],
        });

        let begin = Interaction::new(
            PointerPhase::Begin,
            Ray::new(DVec3::new(0.0, 0.0, 10.0), -DVec3::Z),
        );
        assert!(array.interact(&begin));
        assert!(array.marker("near").unwrap().is_dragged());
        assert!(!array.marker("far").unwrap().is_dragged());
    }

    #[test]
    fn move_axis_constrains_to_the_axis() {
        let control = InteractiveMarkerControl::from_message(
            &vantage_msgs::InteractiveMarkerControl {
                name: "mx".to_string(),
                interaction_mode: InteractionMode::MoveAxis.to_wire(),
                orientation: DQuat::IDENTITY,
                markers: Vec::new(),
            },
            Weak::new(),
        );
        let begin = DragBegin {
            ray: Ray::new(DVec3::new(0.0, 0.0, 10.0), -DVec3::Z),
            pose: Pose::IDENTITY,
            depth: 10.0,
        };
        // Pointer moved diagonally; only x may change.
        let pose = control.dragged_pose(
            &begin,
            &Ray::new(DVec3::new(3.0, 2.0, 10.0), -DVec3::Z),
        );
        assert!((pose.position.x - 3.0).abs() < 1e-9);
        assert_eq!(pose.position.y, 0.0);
        assert_eq!(pose.position.z, 0.0);
    }

    #[test]
    fn rotate_axis_spins_around_the_axis() {
        let control = InteractiveMarkerControl::from_message(
            &vantage_msgs::InteractiveMarkerControl {
                name: "rx".to_string(),
                interaction_mode: InteractionMode::RotateAxis.to_wire(),
                // Rotation axis z: orient control x onto world z.
                orientation: DQuat::from_axis_angle(DVec3::Y, -std::f64::consts::FRAC_PI_2),
                markers: Vec::new(),
            },
            Weak::new(),
        );
        // Levers in the xy plane: from +x to +y is a quarter turn.
        let begin = DragBegin {
            ray: Ray::new(DVec3::new(1.0, 0.0, 10.0), -DVec3::Z),
            pose: Pose::IDENTITY,
            depth: 10.0,
        };
        let pose = control.dragged_pose(
            &begin,
            &Ray::new(DVec3::new(0.0, 1.0, 10.0), -DVec3::Z),
        );
        let rotated = pose.orientation * DVec3::X;
        assert!((rotated - DVec3::Y).length() < 1e-6);
    }

    #[test]
    fn sync_publishes_primitives_and_labels() {
        let array = array();
        array.init(&init_msg(&["a", "b"]));
        array.render_sync(&SyncContext { now_ms: 0 });

        let scene = array.scene();
        assert_eq!(scene.primitives.len(), 2);
        assert_eq!(scene.labels.len(), 2);
        assert_eq!(scene.labels[0].text, "a description");
    }

    #[test]
    fn rotate_rings_hit_on_the_rim_not_through_the_hole() {
        let array = array();
        array.init(&pose_marker_init(Pose::IDENTITY, 1.0));
        let received: Arc<Mutex<Vec<InteractiveMarkerFeedback>>> =
            Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        array.set_feedback_handler(move |fb| sink.lock().push(fb));

        // Straight through the ring hole: the grab sphere takes the event.
        let through = Ray::new(DVec3::new(0.0, 0.0, 10.0), -DVec3::Z);
        assert!(array.interact(&Interaction::new(PointerPhase::Begin, through)));
        array.interact(&Interaction::new(PointerPhase::End, through));
        assert_eq!(received.lock().pop().unwrap().control_name, "center");

        // On the rim (diagonal, away from the move arrows): the z ring.
        let rim = Ray::new(DVec3::new(0.354, 0.354, 10.0), -DVec3::Z);
        assert!(array.interact(&Interaction::new(PointerPhase::Begin, rim)));
        array.interact(&Interaction::new(PointerPhase::End, rim));
        assert_eq!(received.lock().pop().unwrap().control_name, "rotate_z");
    }

    #[test]
    fn pose_display_publishes_once_per_drag() {
        let published: Arc<Mutex<Vec<(String, Pose)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = published.clone();
        let display = InteractivePoseDisplay::new(
            "pose",
            Arc::new(AllMeshes),
            PoseDisplayConfig {
                frame: "map".to_string(),
                ..Default::default()
            },
            move |frame, pose| sink.lock().push((frame.to_string(), *pose)),
        );

        // Hit the center grab sphere and drag it sideways.
        let begin = Interaction::new(
            PointerPhase::Begin,
            Ray::new(DVec3::new(0.0, 0.0, 10.0), -DVec3::Z),
        );
        assert!(display.interact(&begin));
        let sideways = Ray::new(DVec3::new(1.0, 0.0, 10.0), -DVec3::Z);
        display.interact(&Interaction::new(PointerPhase::Move, sideways));
        assert!(published.lock().is_empty());
        display.interact(&Interaction::new(PointerPhase::End, sideways));

        let published = published.lock();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "map");
        assert!((published[0].1.position.x - 1.0).abs() < 1e-6);

        // The transform property follows the published pose.
        assert!((display.config().transform.position.x - 1.0).abs() < 1e-6);
    }
}
