//! The eframe/egui front-end.
//!
//! A toolbar drives the [`MonitorController`]; the central panel plots force
//! over time and a side panel shows the latest reading. Samples are pulled
//! from the controller on a fixed refresh interval, independent of how fast
//! the instrument reports.
mod dialogs;

use self::dialogs::{ConnectDialog, DialogOutcome, ScaleDialog};
use crate::controller::MonitorController;
use egui_plot::{Line, Plot, PlotPoints};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToolbarAction {
    Connect,
    Disconnect,
    Tare,
    Calibrate,
    SetScale,
    Clear,
}

/// The main GUI struct.
pub struct MonitorApp {
    controller: MonitorController,
    refresh_interval: Duration,
    last_refresh: Instant,
    connect_dialog: Option<ConnectDialog>,
    scale_dialog: Option<ScaleDialog>,
    warnings: VecDeque<String>,
    title: String,
}

impl MonitorApp {
    /// Creates the GUI around an existing controller.
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        controller: MonitorController,
        refresh_interval: Duration,
    ) -> Self {
        let title = controller.title();
        Self {
            controller,
            refresh_interval,
            last_refresh: Instant::now(),
            connect_dialog: None,
            scale_dialog: None,
            warnings: VecDeque::new(),
            title,
        }
    }

    /// Pulls new samples once per refresh interval and collects warnings.
    fn refresh(&mut self) {
        if self.last_refresh.elapsed() >= self.refresh_interval {
            self.controller.tick();
            self.last_refresh = Instant::now();
        }
        self.warnings.extend(
            self.controller
                .take_notifications()
                .into_iter()
                .map(|n| n.to_string()),
        );
    }

    fn apply(&mut self, action: ToolbarAction) {
        match action {
            ToolbarAction::Connect => {
                let ports = self.controller.session().driver().available_ports();
                self.connect_dialog = Some(ConnectDialog::new(ports));
            }
            ToolbarAction::Disconnect => self.controller.on_disconnect_requested(),
            ToolbarAction::Tare => self.controller.on_tare_requested(),
            ToolbarAction::Calibrate => self.controller.on_calibrate_requested(),
            ToolbarAction::SetScale => self.scale_dialog = Some(ScaleDialog::default()),
            ToolbarAction::Clear => self.controller.on_clear_requested(),
        }
    }

    fn show_dialogs(&mut self, ctx: &egui::Context) {
        match self.connect_dialog.as_mut().map(|dialog| dialog.show(ctx)) {
            Some(DialogOutcome::Accepted(port)) => {
                self.connect_dialog = None;
                self.controller.on_connect_requested(&port);
            }
            Some(DialogOutcome::Cancelled) => self.connect_dialog = None,
            Some(DialogOutcome::Open) | None => {}
        }

        match self.scale_dialog.as_mut().map(|dialog| dialog.show(ctx)) {
            Some(DialogOutcome::Accepted(scale)) => {
                self.scale_dialog = None;
                self.controller.on_set_scale_requested(&scale);
            }
            Some(DialogOutcome::Cancelled) => self.scale_dialog = None,
            Some(DialogOutcome::Open) | None => {}
        }

        let mut dismissed = false;
        if let Some(message) = self.warnings.front() {
            egui::Window::new("Error")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(message);
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
        }
        if dismissed {
            self.warnings.pop_front();
        }
    }
}

impl eframe::App for MonitorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.refresh();

        let title = self.controller.title();
        if title != self.title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.title = title;
        }

        let mut action = None;
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            action = toolbar(ui);
        });
        if let Some(action) = action {
            self.apply(action);
        }

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            status_bar(ui, &self.controller);
        });

        egui::SidePanel::right("weight")
            .resizable(true)
            .min_width(180.0)
            .show(ctx, |ui| {
                weight_readout(ui, &self.controller);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            force_plot(ui, &self.controller);
        });

        self.show_dialogs(ctx);

        ctx.request_repaint_after(self.refresh_interval);
    }
}

fn toolbar(ui: &mut egui::Ui) -> Option<ToolbarAction> {
    let mut action = None;
    ui.horizontal(|ui| {
        let mut button = |ui: &mut egui::Ui, label: &str, tip: &str, which: ToolbarAction| {
            if ui.button(label).on_hover_text(tip).clicked() {
                action = Some(which);
            }
        };
        button(ui, "Connect", "Connect COM port", ToolbarAction::Connect);
        button(
            ui,
            "Disconnect",
            "Disconnect from serial COM port",
            ToolbarAction::Disconnect,
        );
        ui.separator();
        button(ui, "Tare", "Set offset", ToolbarAction::Tare);
        button(ui, "Calibrate", "Start weight calibration", ToolbarAction::Calibrate);
        button(ui, "Set scale", "Set prescale value", ToolbarAction::SetScale);
        ui.separator();
        button(ui, "Clear", "Clear current data", ToolbarAction::Clear);
    });
    action
}

fn status_bar(ui: &mut egui::Ui, controller: &MonitorController) {
    ui.horizontal(|ui| {
        match controller.session().port_name() {
            Some(port) => ui.label(format!("Connected to {port}")),
            None if controller.session().is_tearing_down() => ui.label("Disconnecting..."),
            None => ui.label("Disconnected"),
        };
        ui.separator();
        ui.label(format!("{} samples", controller.buffer().len()));
        if controller.lost_samples() > 0 {
            ui.separator();
            ui.label(format!("{} dropped", controller.lost_samples()));
        }
    });
}

fn weight_readout(ui: &mut egui::Ui, controller: &MonitorController) {
    ui.heading("Weight");
    let text = controller
        .buffer()
        .latest()
        .map(|sample| sample.value().to_string())
        .unwrap_or_else(|| "-".to_owned());
    ui.label(egui::RichText::new(text).monospace().size(40.0));
}

fn force_plot(ui: &mut egui::Ui, controller: &MonitorController) {
    let line = Line::new(PlotPoints::from_iter(controller.buffer().points()))
        .color(egui::Color32::RED)
        .width(2.0);
    Plot::new("force_plot")
        .x_axis_label("Time [s]")
        .y_axis_label("Force [N]")
        .show(ui, |plot_ui| {
            plot_ui.line(line);
        });
}
