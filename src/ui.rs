use glam::Vec3;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::material;
use crate::render::EguiDraw;

/// Small egui overlay exposing the tweakable scene parameters, currently the
/// background clear color.
pub struct DebugPanel {
    ctx: egui::Context,
    state: egui_winit::State,
    clear_color: [f32; 3],
    visible: bool,
}

/// Result of building one panel frame.
pub struct PanelFrame {
    pub draw: EguiDraw,
    /// Set when the color picker changed this frame; the renderer should
    /// re-apply it as the new clear color.
    pub clear_color: Option<Vec3>,
}

impl DebugPanel {
    pub fn new(window: &Window, scale_factor: f32) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(scale_factor),
            None,
            None,
        );
        let default = material::default_clear_color();
        Self {
            ctx,
            state,
            clear_color: [default.x, default.y, default.z],
            visible: true,
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    /// Feeds a window event to egui. Returns true when egui consumed it and
    /// the camera controls should ignore it.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.state.on_window_event(window, event);
        if response.repaint {
            window.request_redraw();
        }
        response.consumed
    }

    /// Runs the panel UI for this frame and returns the tessellated output.
    pub fn frame(&mut self, window: &Window, size: (u32, u32)) -> PanelFrame {
        let input = self.state.take_egui_input(window);
        let visible = self.visible;
        let mut clear_color = self.clear_color;
        let mut changed = false;

        let output = self.ctx.run(input, |ctx| {
            if !visible {
                return;
            }
            egui::Window::new("Scene")
                .default_pos((12.0, 12.0))
                .resizable(false)
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        ui.label("Background");
                        if egui::color_picker::color_edit_button_rgb(ui, &mut clear_color)
                            .changed()
                        {
                            changed = true;
                        }
                    });
                });
        });
        self.clear_color = clear_color;

        self.state
            .handle_platform_output(window, output.platform_output);
        let pixels_per_point = output.pixels_per_point;
        let paint_jobs = self.ctx.tessellate(output.shapes, pixels_per_point);

        PanelFrame {
            draw: EguiDraw {
                textures_delta: output.textures_delta,
                paint_jobs,
                screen: egui_wgpu::ScreenDescriptor {
                    size_in_pixels: [size.0, size.1],
                    pixels_per_point,
                },
            },
            clear_color: changed.then(|| Vec3::from_array(clear_color)),
        }
    }
}
