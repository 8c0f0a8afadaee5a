use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use gpui::{
    AnyElement, App, AppContext, Context, FocusHandle, InteractiveElement, IntoElement,
    KeyDownEvent, ObjectFit, ParentElement, Render, RenderImage, Styled, StyledImage,
    TitlebarOptions, Window, WindowOptions, div, img, px,
};
use gpui_component::{ActiveTheme, Root, StyledExt, h_flex, v_flex};
use image::{Frame as ImageFrame, ImageBuffer, Rgba};

use crate::pipeline::{CompositedFrame, ControlEvent, FrameCompositor, HudModel, SensorSession};

mod hud_view;
mod render_util;

const WINDOW_TITLE: &str = "Turret Sight";

pub fn launch_ui(
    app: &mut App,
    output_rx: Receiver<CompositedFrame>,
    control_tx: Sender<ControlEvent>,
    session: Option<SensorSession>,
    compositor: FrameCompositor,
) -> gpui::Result<()> {
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some(WINDOW_TITLE.into()),
            appears_transparent: false,
            traffic_light_position: None,
        }),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let view = app.new(|cx| AppView::new(output_rx, control_tx, session, compositor, cx));
        // Arrow and digit keys go straight to the aim controls.
        let focus_handle = view.read(app).focus_handle.clone();
        window.focus(&focus_handle);
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

struct VideoInfo {
    width: u32,
    height: u32,
    sequence: u64,
}

// Field order matters: the sensor closes before the compositor stops.
struct AppView {
    session: Option<SensorSession>,
    _compositor: FrameCompositor,
    output_rx: Receiver<CompositedFrame>,
    control_tx: Sender<ControlEvent>,
    latest_image: Option<Arc<RenderImage>>,
    latest_video: Option<VideoInfo>,
    latest_hud: Option<HudModel>,
    focus_handle: FocusHandle,
}

impl AppView {
    fn new(
        output_rx: Receiver<CompositedFrame>,
        control_tx: Sender<ControlEvent>,
        session: Option<SensorSession>,
        compositor: FrameCompositor,
        cx: &mut Context<'_, Self>,
    ) -> Self {
        Self {
            session,
            _compositor: compositor,
            output_rx,
            control_tx,
            latest_image: None,
            latest_video: None,
            latest_hud: None,
            focus_handle: cx.focus_handle(),
        }
    }

    fn poll_composited_frames(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        let mut frames = Vec::new();
        while let Ok(frame) = self.output_rx.try_recv() {
            frames.push(frame);
        }

        for frame in frames {
            if let Some(video) = frame.video {
                let info = VideoInfo {
                    width: video.width,
                    height: video.height,
                    sequence: video.sequence,
                };
                if let Some(image) = render_util::frame_to_image(video) {
                    self.replace_latest_image(image, window, cx);
                    self.latest_video = Some(info);
                }
            }
            self.latest_hud = Some(frame.hud);
        }
    }

    fn replace_latest_image(
        &mut self,
        new_image: Arc<RenderImage>,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        if let Some(old_image) = self.latest_image.replace(new_image) {
            // Explicitly drop the previous GPU texture; otherwise the sprite atlas keeps
            // every frame and memory will climb rapidly while the sensor is running.
            cx.drop_image(old_image, Some(window));
        }
    }

    fn handle_key_down(
        &mut self,
        event: &KeyDownEvent,
        _: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        let Some(control) = ControlEvent::from_key(event.keystroke.key.as_str()) else {
            return;
        };
        if self.control_tx.send(control).is_err() {
            log::warn!("compositor gone, dropping {control:?}");
        }
        cx.stop_propagation();
    }

    fn render_video(&self) -> AnyElement {
        if let Some(image) = &self.latest_image {
            img(image.clone())
                .size_full()
                .object_fit(ObjectFit::Contain)
                .into_any_element()
        } else {
            div()
                .size_full()
                .flex()
                .items_center()
                .justify_center()
                .text_sm()
                .text_color(gpui::rgb(0x8b95a5))
                .child("Waiting for sensor...")
                .into_any_element()
        }
    }
}

impl Render for AppView {
    fn render(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> impl gpui::IntoElement {
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });

        self.poll_composited_frames(window, cx);

        // The HUD is its own layer stacked over the video, never drawn into it.
        let hud_layer = div()
            .absolute()
            .top_0()
            .left_0()
            .size_full()
            .child(self.render_hud(cx));

        div()
            .track_focus(&self.focus_handle)
            .on_key_down(cx.listener(Self::handle_key_down))
            .size_full()
            .relative()
            .overflow_hidden()
            .bg(gpui::rgb(0x000000))
            .child(self.render_video())
            .child(hud_layer)
    }
}
