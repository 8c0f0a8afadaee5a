use super::{
    ActiveTheme, AnyElement, AppView, Context, IntoElement, ParentElement, Styled, StyledExt, div,
    h_flex, px, v_flex,
};
use crate::pipeline::HudModel;

const PANEL_BG: u32 = 0x0f1419cc;
const LABEL_COLOR: u32 = 0x8b95a5;
const VALUE_COLOR: u32 = 0xe2e8f0;
const RETICLE_COLOR: u32 = 0x60a5faff;
const RETICLE_ARM: f32 = 14.0;

impl AppView {
    pub(super) fn render_hud(&self, cx: &mut Context<'_, Self>) -> AnyElement {
        let Some(hud) = self.latest_hud.as_ref() else {
            return div().into_any_element();
        };

        div()
            .relative()
            .size_full()
            .child(self.render_readouts(hud))
            .child(self.render_ready_badge(hud, cx))
            .child(render_reticle())
            .child(self.render_source_line())
            .into_any_element()
    }

    fn render_readouts(&self, hud: &HudModel) -> AnyElement {
        let mut panel = v_flex()
            .absolute()
            .top(px(16.0))
            .left(px(16.0))
            .gap_1()
            .p_3()
            .rounded_lg()
            .bg(gpui::rgba(PANEL_BG));

        for (label, value) in hud.readouts() {
            panel = panel.child(
                h_flex()
                    .gap_3()
                    .justify_between()
                    .min_w(px(180.0))
                    .child(
                        div()
                            .text_xs()
                            .text_color(gpui::rgb(LABEL_COLOR))
                            .child(label),
                    )
                    .child(
                        div()
                            .text_sm()
                            .font_semibold()
                            .text_color(gpui::rgb(VALUE_COLOR))
                            .child(value),
                    ),
            );
        }

        panel.into_any_element()
    }

    fn render_ready_badge(&self, hud: &HudModel, cx: &mut Context<'_, Self>) -> AnyElement {
        let theme = cx.theme();
        let (icon, color) = if hud.system_ready {
            ("●", theme.success)
        } else {
            ("○", theme.danger)
        };

        div()
            .absolute()
            .top(px(16.0))
            .right(px(16.0))
            .px_2()
            .py_0p5()
            .rounded_md()
            .bg(gpui::rgba(PANEL_BG))
            .text_xs()
            .text_color(color)
            .child(format!("{icon} {}", hud.ready_label()))
            .into_any_element()
    }

    fn render_source_line(&self) -> AnyElement {
        let name = self
            .session
            .as_ref()
            .map(|session| session.name().to_string())
            .unwrap_or_else(|| "no sensor".to_string());

        let text = match &self.latest_video {
            Some(video) => format!(
                "{name} {}x{} #{}",
                video.width, video.height, video.sequence
            ),
            None => format!("{name}, waiting for video..."),
        };

        div()
            .absolute()
            .bottom(px(12.0))
            .left(px(16.0))
            .text_xs()
            .text_color(gpui::rgb(LABEL_COLOR))
            .child(text)
            .into_any_element()
    }
}

/// Fixed crosshair at the image center.
fn render_reticle() -> AnyElement {
    let arm = px(RETICLE_ARM * 2.0);
    div()
        .absolute()
        .size_full()
        .flex()
        .items_center()
        .justify_center()
        .child(
            div()
                .relative()
                .size(arm)
                .child(
                    div()
                        .absolute()
                        .top(px(RETICLE_ARM))
                        .left_0()
                        .w(arm)
                        .h(px(1.0))
                        .bg(gpui::rgba(RETICLE_COLOR)),
                )
                .child(
                    div()
                        .absolute()
                        .left(px(RETICLE_ARM))
                        .top_0()
                        .h(arm)
                        .w(px(1.0))
                        .bg(gpui::rgba(RETICLE_COLOR)),
                ),
        )
        .into_any_element()
}
