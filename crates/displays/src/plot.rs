//! Time-series plots over live topics.
//!
//! Each configured topic buffers incoming samples on the publishing thread;
//! `render_sync` evaluates the configured queries, maintains the sliding
//! window and publishes a paint-ready snapshot; `paint` draws axes, grid,
//! ticks and polylines from that snapshot alone.

use std::sync::Arc;

use glam::Vec2;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use vantage_msgs::{ColorRgba, MessageQuery, Value};
use vantage_render::{AsyncContext, SceneNode, Snapshot, SyncContext};
use vantage_topics::{Subscriber, TopicBus, Watcher};

use crate::paint::{Painter, Stroke, TextAnchor};
use crate::Display;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlotMargins {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlotAxis {
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotAxes {
    pub line_width: f64,
    pub font_size: f64,
    pub x: PlotAxis,
    pub y: PlotAxis,
}

impl Default for PlotAxes {
    fn default() -> Self {
        Self {
            line_width: 1.5,
            font_size: 14.0,
            x: PlotAxis {
                label: "Time".to_string(),
            },
            y: PlotAxis {
                label: "Value".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotTicksX {
    /// Pixel stride between ticks.
    pub stride: f64,
}

impl Default for PlotTicksX {
    fn default() -> Self {
        Self { stride: 100.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotTicksY {
    pub stride: f64,
    /// Width reserved for tick labels.
    pub width: f64,
}

impl Default for PlotTicksY {
    fn default() -> Self {
        Self {
            stride: 60.0,
            width: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotTicks {
    pub length: f64,
    pub width: f64,
    pub font_size: f64,
    pub x: PlotTicksX,
    pub y: PlotTicksY,
}

impl Default for PlotTicks {
    fn default() -> Self {
        Self {
            length: 6.0,
            width: 1.0,
            font_size: 12.0,
            x: PlotTicksX::default(),
            y: PlotTicksY::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotTitle {
    pub enable: bool,
    pub text: String,
    pub font_size: f64,
}

impl Default for PlotTitle {
    fn default() -> Self {
        Self {
            enable: false,
            text: "Title".to_string(),
            font_size: 16.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotGrid {
    pub enable: bool,
    pub width: f64,
}

impl Default for PlotGrid {
    fn default() -> Self {
        Self {
            enable: true,
            width: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotStyle {
    pub axes: PlotAxes,
    pub margins: PlotMargins,
    pub ticks: PlotTicks,
    pub frame_width: f64,
    pub graph_width: f64,
    pub padding: f64,
    pub background_color: ColorRgba,
    pub foreground_color: ColorRgba,
    pub title: PlotTitle,
    pub grid: PlotGrid,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            axes: PlotAxes::default(),
            margins: PlotMargins::default(),
            ticks: PlotTicks::default(),
            frame_width: 1.5,
            graph_width: 1.5,
            padding: 5.0,
            background_color: ColorRgba::WHITE,
            foreground_color: ColorRgba::BLACK,
            title: PlotTitle::default(),
            grid: PlotGrid::default(),
        }
    }
}

/// One scalar extraction on a topic: query expression plus display color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotQuery {
    pub query: String,
    pub color: ColorRgba,
}

impl Default for PlotQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            color: ColorRgba::BLACK,
        }
    }
}

/// One plotted topic with its ordered query list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlotTopic {
    pub topic: String,
    pub queries: Vec<PlotQuery>,
}

/// Rows the configuration UI keeps exactly one trailing blank of.
pub trait BlankRow {
    fn is_blank(&self) -> bool;
}

impl BlankRow for PlotQuery {
    fn is_blank(&self) -> bool {
        self.query.is_empty()
    }
}

impl BlankRow for PlotTopic {
    fn is_blank(&self) -> bool {
        self.topic.is_empty()
            && (self.queries.is_empty()
                || (self.queries.len() == 1 && self.queries[0].is_blank()))
    }
}

/// Removes blank rows except exactly one trailing blank, so the list always
/// offers one ready-to-fill entry. Reapplied after every edit.
pub fn filter_array<T: BlankRow + Default>(data: &mut Vec<T>) {
    let mut index = 0;
    while index + 1 < data.len() {
        if data[index].is_blank() {
            data.remove(index);
        } else {
            index += 1;
        }
    }
    if data.last().map(|row| !row.is_blank()).unwrap_or(true) {
        data.push(T::default());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotDisplayConfig {
    /// Sliding window length in seconds.
    pub duration: f64,
    pub topics: Vec<PlotTopic>,
    pub style: PlotStyle,
}

impl Default for PlotDisplayConfig {
    fn default() -> Self {
        Self {
            duration: 10.0,
            topics: vec![PlotTopic::default()],
            style: PlotStyle::default(),
        }
    }
}

/// Paint-ready state published by the sync phase.
#[derive(Default)]
pub struct PlotScene {
    pub style: PlotStyle,
    pub duration_ms: i64,
    pub now_ms: i64,
    pub series: Vec<PlotSeries>,
}

pub struct PlotSeries {
    pub color: ColorRgba,
    pub points: Vec<(i64, f64)>,
}

struct PlotRendererQuery {
    raw: String,
    query: Option<MessageQuery>,
    color: ColorRgba,
    points: Vec<(i64, f64)>,
}

struct PlotRendererTopic {
    topic: String,
    _sub: Subscriber<Value>,
    inbox: Arc<Mutex<Vec<(i64, Arc<Value>)>>>,
    queries: Vec<PlotRendererQuery>,
}

impl PlotRendererTopic {
    fn subscribe(bus: &TopicBus, topic: &str) -> Self {
        let sub = bus.subscribe::<Value>(topic);
        let inbox: Arc<Mutex<Vec<(i64, Arc<Value>)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = inbox.clone();
        sub.set_callback(move |value| {
            sink.lock()
                .push((chrono::Utc::now().timestamp_millis(), value));
        });
        Self {
            topic: topic.to_string(),
            _sub: sub,
            inbox,
            queries: Vec::new(),
        }
    }

    /// Aligns the runtime query list with the configuration, keeping the
    /// buffered points of queries whose expression is unchanged.
    fn reconcile_queries(&mut self, configs: &[PlotQuery]) {
        let mut old = std::mem::take(&mut self.queries);
        for config in configs.iter().filter(|q| !q.query.is_empty()) {
            let points = old
                .iter()
                .position(|q| q.raw == config.query)
                .map(|i| old.swap_remove(i).points)
                .unwrap_or_default();
            let query = match MessageQuery::parse(&config.query) {
                Ok(query) => Some(query),
                Err(error) => {
                    tracing::debug!(query = %config.query, %error, "invalid plot query");
                    None
                }
            };
            self.queries.push(PlotRendererQuery {
                raw: config.query.clone(),
                query,
                color: config.color,
                points,
            });
        }
    }
}

struct PlotRendererData {
    topics: Vec<PlotRendererTopic>,
    config_watch: Watcher<Vec<PlotTopic>>,
}

/// Sync/async pipeline of one plot display.
pub struct PlotRenderer {
    data: Mutex<PlotRendererData>,
    scene: Snapshot<PlotScene>,
}

impl PlotRenderer {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(PlotRendererData {
                topics: Vec::new(),
                config_watch: Watcher::new(),
            }),
            scene: Snapshot::new(),
        }
    }

    /// Producer-side phase: drain buffered samples, evaluate queries, trim
    /// the sliding window and publish the paint snapshot.
    pub fn render_sync(&self, config: &PlotDisplayConfig, now_ms: i64, bus: &TopicBus) {
        let mut data = self.data.lock();
        if data.config_watch.changed(config.topics.clone()) {
            Self::rebuild(&mut data, config, bus);
        }

        let duration_ms = ((config.duration.max(0.001)) * 1000.0) as i64;
        let cutoff = now_ms - duration_ms;
        for topic in &mut data.topics {
            let samples = std::mem::take(&mut *topic.inbox.lock());
            for query in &mut topic.queries {
                if let Some(parsed) = &query.query {
                    for (stamp, value) in &samples {
                        if let Some(v) = parsed.evaluate(value) {
                            if v.is_finite() {
                                query.points.push((*stamp, v));
                            }
                        }
                    }
                }
                query.points.retain(|&(stamp, _)| stamp >= cutoff);
            }
        }

        let series = data
            .topics
            .iter()
            .flat_map(|topic| {
                topic.queries.iter().map(|query| PlotSeries {
                    color: query.color,
                    points: query.points.clone(),
                })
            })
            .collect();
        self.scene.publish(PlotScene {
            style: config.style.clone(),
            duration_ms,
            now_ms,
            series,
        });
    }

    fn rebuild(data: &mut PlotRendererData, config: &PlotDisplayConfig, bus: &TopicBus) {
        let mut old = std::mem::take(&mut data.topics);
        for topic_config in config.topics.iter().filter(|t| !t.topic.is_empty()) {
            let mut entry = match old.iter().position(|t| t.topic == topic_config.topic) {
                Some(index) => old.swap_remove(index),
                None => PlotRendererTopic::subscribe(bus, &topic_config.topic),
            };
            entry.reconcile_queries(&topic_config.queries);
            data.topics.push(entry);
        }
        // Dropped entries unsubscribe here, before their buffers go away.
    }

    /// Paint-thread phase: reads the snapshot only.
    pub fn paint(&self, painter: &mut dyn Painter) {
        let scene = self.scene.read();
        let style = &scene.style;
        let extent = painter.extent();

        let outer_min = Vec2::new(style.margins.left as f32, style.margins.top as f32);
        let outer_max = Vec2::new(
            extent.x - style.margins.right as f32,
            extent.y - style.margins.bottom as f32,
        );
        if outer_max.x - outer_min.x < 32.0 || outer_max.y - outer_min.y < 32.0 {
            return;
        }
        painter.fill_rect(outer_min, outer_max, style.background_color);

        let fg = style.foreground_color;
        let pad = style.padding as f32;
        let tick_font = style.ticks.font_size as f32;
        let axis_font = style.axes.font_size as f32;

        let mut top = outer_min.y + pad;
        if style.title.enable {
            painter.text(
                Vec2::new((outer_min.x + outer_max.x) * 0.5, top),
                TextAnchor::CenterTop,
                &style.title.text,
                style.title.font_size as f32,
                fg,
            );
            top += style.title.font_size as f32 + pad;
        }

        let left = outer_min.x + pad + axis_font + style.ticks.y.width as f32;
        let right = outer_max.x - pad;
        let bottom = outer_max.y - pad - axis_font - tick_font - style.ticks.length as f32;
        if right - left < 16.0 || bottom - top < 16.0 {
            return;
        }

        let width = right - left;
        let height = bottom - top;

        // Auto-scaled value range over the visible window, padded slightly;
        // a constant series is widened so its line stays visible.
        let mut min_value = f64::INFINITY;
        let mut max_value = f64::NEG_INFINITY;
        for series in &scene.series {
            for &(_, value) in &series.points {
                min_value = min_value.min(value);
                max_value = max_value.max(value);
            }
        }
        if !min_value.is_finite() || !max_value.is_finite() {
            min_value = 0.0;
            max_value = 1.0;
        }
        let span = max_value - min_value;
        if span < 1e-9 {
            min_value -= 0.5;
            max_value += 0.5;
        } else {
            min_value -= span * 0.05;
            max_value += span * 0.05;
        }
        let span = max_value - min_value;

        let grid_stroke = Stroke::new(style.grid.width as f32, fg.with_alpha(0.15));
        let tick_stroke = Stroke::new(style.ticks.width as f32, fg);
        let tick_len = style.ticks.length as f32;
        let duration_s = scene.duration_ms as f64 / 1000.0;

        // Vertical ticks march left from the "now" edge at a fixed pixel
        // stride; labels show the time offset.
        let x_stride = (style.ticks.x.stride as f32).max(10.0);
        let mut i = 0;
        loop {
            let x = right - i as f32 * x_stride;
            if x < left {
                break;
            }
            if style.grid.enable {
                painter.line(Vec2::new(x, top), Vec2::new(x, bottom), grid_stroke);
            }
            painter.line(
                Vec2::new(x, bottom),
                Vec2::new(x, bottom + tick_len),
                tick_stroke,
            );
            let offset_s = -(i as f64) * x_stride as f64 / width as f64 * duration_s;
            painter.text(
                Vec2::new(x, bottom + tick_len),
                TextAnchor::CenterTop,
                &format!("{offset_s:.1}"),
                tick_font,
                fg,
            );
            i += 1;
        }

        let y_stride = (style.ticks.y.stride as f32).max(10.0);
        let mut i = 0;
        loop {
            let y = bottom - i as f32 * y_stride;
            if y < top {
                break;
            }
            if style.grid.enable {
                painter.line(Vec2::new(left, y), Vec2::new(right, y), grid_stroke);
            }
            painter.line(
                Vec2::new(left - tick_len, y),
                Vec2::new(left, y),
                tick_stroke,
            );
            let value = min_value + (bottom - y) as f64 / height as f64 * span;
            painter.text(
                Vec2::new(left - tick_len - 2.0, y),
                TextAnchor::RightCenter,
                &format_tick(value),
                tick_font,
                fg,
            );
            i += 1;
        }

        painter.stroke_rect(
            Vec2::new(left, top),
            Vec2::new(right, bottom),
            Stroke::new(style.frame_width as f32, fg),
        );

        painter.text(
            Vec2::new((left + right) * 0.5, outer_max.y - pad),
            TextAnchor::CenterBottom,
            &style.axes.x.label,
            axis_font,
            fg,
        );
        painter.text(
            Vec2::new(outer_min.x + pad, (top + bottom) * 0.5),
            TextAnchor::LeftCenter,
            &style.axes.y.label,
            axis_font,
            fg,
        );

        for series in &scene.series {
            let stroke = Stroke::new(style.graph_width as f32, series.color);
            let points: Vec<Vec2> = series
                .points
                .iter()
                .map(|&(stamp, value)| {
                    let age = (scene.now_ms - stamp) as f32 / scene.duration_ms as f32;
                    Vec2::new(
                        right - age * width,
                        bottom - ((value - min_value) / span) as f32 * height,
                    )
                })
                .collect();
            match points.len() {
                0 => {}
                1 => painter.line(
                    points[0] - Vec2::new(1.0, 0.0),
                    points[0] + Vec2::new(1.0, 0.0),
                    stroke,
                ),
                _ => painter.polyline(&points, stroke),
            }
        }
    }
}

impl Default for PlotRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn format_tick(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1000.0 {
        format!("{value:.0}")
    } else if magnitude >= 10.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.2}")
    }
}

/// A 2D chart display fed by topic queries.
pub struct PlotDisplay {
    name: String,
    bus: Arc<TopicBus>,
    config: Mutex<PlotDisplayConfig>,
    renderer: PlotRenderer,
}

impl PlotDisplay {
    pub fn new(name: &str, bus: Arc<TopicBus>, config: PlotDisplayConfig) -> Arc<Self> {
        let display = Arc::new(Self {
            name: name.to_string(),
            bus,
            config: Mutex::new(config),
            renderer: PlotRenderer::new(),
        });
        display.refresh();
        display
    }

    pub fn config(&self) -> PlotDisplayConfig {
        self.config.lock().clone()
    }

    pub fn set_config(&self, config: PlotDisplayConfig) {
        *self.config.lock() = config;
        self.refresh();
    }
}

impl SceneNode for PlotDisplay {
    fn render_sync(&self, ctx: &SyncContext) {
        let config = self.config.lock().clone();
        self.renderer.render_sync(&config, ctx.now_ms, &self.bus);
    }

    fn render_async(&self, _ctx: &mut AsyncContext<'_>) {
        // Plots have no 3D output; everything happens in `paint`.
    }
}

impl Display for PlotDisplay {
    fn name(&self) -> &str {
        &self.name
    }

    fn refresh(&self) {
        let mut config = self.config.lock();
        filter_array(&mut config.topics);
        for topic in &mut config.topics {
            filter_array(&mut topic.queries);
        }
    }

    fn paint(&self, painter: &mut dyn Painter, _camera: &vantage_render::CameraBlock) {
        self.renderer.paint(painter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn value_with(field: &str, v: f64) -> Value {
        let mut map = BTreeMap::new();
        map.insert(field.to_string(), Value::F64(v));
        Value::Map(map)
    }

    fn config_for(topic: &str, query: &str) -> PlotDisplayConfig {
        PlotDisplayConfig {
            duration: 10.0,
            topics: vec![PlotTopic {
                topic: topic.to_string(),
                queries: vec![PlotQuery {
                    query: query.to_string(),
                    color: ColorRgba::BLACK,
                }],
            }],
            style: PlotStyle::default(),
        }
    }

    fn push_sample(renderer: &PlotRenderer, stamp: i64, value: Value) {
        let data = renderer.data.lock();
        data.topics[0].inbox.lock().push((stamp, Arc::new(value)));
    }

    #[test]
    fn window_trimming_is_monotonic() {
        let bus = TopicBus::new();
        let renderer = PlotRenderer::new();
        let config = config_for("t", "v");
        renderer.render_sync(&config, 0, &bus);

        for stamp in [1_000, 5_000, 9_000, 12_000] {
            push_sample(&renderer, stamp, value_with("v", stamp as f64));
        }
        renderer.render_sync(&config, 12_000, &bus);

        let scene = renderer.scene.read();
        let stamps: Vec<i64> = scene.series[0].points.iter().map(|p| p.0).collect();
        // 1_000 < 12_000 - 10_000 fell out of the window.
        assert_eq!(stamps, vec![5_000, 9_000, 12_000]);

        // Advancing time keeps trimming; nothing older than the cutoff
        // survives.
        renderer.render_sync(&config, 16_000, &bus);
        let scene = renderer.scene.read();
        let stamps: Vec<i64> = scene.series[0].points.iter().map(|p| p.0).collect();
        assert_eq!(stamps, vec![9_000, 12_000]);
        assert!(stamps.iter().all(|&s| s >= 16_000 - 10_000));
    }

    #[test]
    fn samples_arrive_through_the_bus_callback() {
        let bus = TopicBus::new();
        let renderer = PlotRenderer::new();
        let config = config_for("signal", "pos.x");
        renderer.render_sync(&config, 0, &bus);

        let mut pos = BTreeMap::new();
        pos.insert("x".to_string(), Value::F64(2.5));
        let mut root = BTreeMap::new();
        root.insert("pos".to_string(), Value::Map(pos));
        bus.publish("signal", Value::Map(root));

        let now = chrono::Utc::now().timestamp_millis();
        renderer.render_sync(&config, now, &bus);
        let scene = renderer.scene.read();
        assert_eq!(scene.series[0].points.len(), 1);
        assert_eq!(scene.series[0].points[0].1, 2.5);
    }

    #[test]
    fn bad_queries_and_missing_fields_degrade_to_empty_series() {
        let bus = TopicBus::new();
        let renderer = PlotRenderer::new();
        let config = config_for("t", "v[oops");
        renderer.render_sync(&config, 0, &bus);
        push_sample(&renderer, 100, value_with("v", 1.0));
        renderer.render_sync(&config, 200, &bus);

        let scene = renderer.scene.read();
        assert_eq!(scene.series.len(), 1);
        assert!(scene.series[0].points.is_empty());
    }

    #[test]
    fn points_survive_a_config_change_that_keeps_the_query() {
        let bus = TopicBus::new();
        let renderer = PlotRenderer::new();
        let mut config = config_for("t", "v");
        renderer.render_sync(&config, 0, &bus);
        push_sample(&renderer, 100, value_with("v", 1.0));
        renderer.render_sync(&config, 200, &bus);

        // Recolor only; the expression is unchanged.
        config.topics[0].queries[0].color = ColorRgba::new(1.0, 0.0, 0.0, 1.0);
        renderer.render_sync(&config, 300, &bus);
        let scene = renderer.scene.read();
        assert_eq!(scene.series[0].points.len(), 1);

        // A different expression starts from scratch.
        config.topics[0].queries[0].query = "w".to_string();
        renderer.render_sync(&config, 400, &bus);
        let scene = renderer.scene.read();
        assert!(scene.series[0].points.is_empty());
    }

    #[test]
    fn filter_array_keeps_exactly_one_trailing_blank() {
        let mut rows = vec![
            PlotTopic {
                topic: "a".to_string(),
                queries: Vec::new(),
            },
            PlotTopic::default(),
            PlotTopic::default(),
        ];
        filter_array(&mut rows);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].topic, "a");
        assert!(rows[1].is_blank());

        let mut empty: Vec<PlotTopic> = Vec::new();
        filter_array(&mut empty);
        assert_eq!(empty.len(), 1);
        assert!(empty[0].is_blank());

        // A trailing non-blank row gains a blank after it.
        let mut rows = vec![PlotTopic {
            topic: "a".to_string(),
            queries: Vec::new(),
        }];
        filter_array(&mut rows);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn topic_blankness_tolerates_one_blank_query_row() {
        let mut topic = PlotTopic::default();
        assert!(topic.is_blank());
        topic.queries.push(PlotQuery::default());
        assert!(topic.is_blank());
        topic.queries[0].query = "v".to_string();
        assert!(!topic.is_blank());
    }

    #[derive(Default)]
    struct RecordingPainter {
        extent: Vec2,
        fills: usize,
        polylines: Vec<Vec<Vec2>>,
        texts: Vec<String>,
    }

    impl Painter for RecordingPainter {
        fn extent(&self) -> Vec2 {
            self.extent
        }
        fn fill_rect(&mut self, _min: Vec2, _max: Vec2, _color: ColorRgba) {
            self.fills += 1;
        }
        fn stroke_rect(&mut self, _min: Vec2, _max: Vec2, _stroke: Stroke) {}
        fn line(&mut self, _from: Vec2, _to: Vec2, _stroke: Stroke) {}
        fn polyline(&mut self, points: &[Vec2], _stroke: Stroke) {
            self.polylines.push(points.to_vec());
        }
        fn text(&mut self, _pos: Vec2, _anchor: TextAnchor, text: &str, _size: f32, _color: ColorRgba) {
            self.texts.push(text.to_string());
        }
    }

    #[test]
    fn paint_strokes_one_polyline_per_series_inside_the_frame() {
        let bus = TopicBus::new();
        let renderer = PlotRenderer::new();
        let config = config_for("t", "v");
        renderer.render_sync(&config, 0, &bus);
        for (stamp, v) in [(2_000, 1.0), (6_000, 3.0), (10_000, 2.0)] {
            push_sample(&renderer, stamp, value_with("v", v));
        }
        renderer.render_sync(&config, 10_000, &bus);

        let mut painter = RecordingPainter {
            extent: Vec2::new(400.0, 300.0),
            ..Default::default()
        };
        renderer.paint(&mut painter);

        assert_eq!(painter.fills, 1);
        assert_eq!(painter.polylines.len(), 1);
        let line = &painter.polylines[0];
        assert_eq!(line.len(), 3);
        assert!(line
            .iter()
            .all(|p| p.x >= 0.0 && p.x <= 400.0 && p.y >= 0.0 && p.y <= 300.0));
        // Newest point sits at the right edge of the data area.
        assert!(line[2].x > line[1].x && line[1].x > line[0].x);
        // Axis labels made it out.
        assert!(painter.texts.iter().any(|t| t == "Time"));
    }
}
