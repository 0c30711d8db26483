//! Modal input dialogs for the toolbar actions.

/// Result of showing a dialog for one frame.
pub(super) enum DialogOutcome<T> {
    Open,
    Accepted(T),
    Cancelled,
}

/// Asks for the serial port to open, offering the enumerated ones.
pub(super) struct ConnectDialog {
    ports: Vec<String>,
    port: String,
}

impl ConnectDialog {
    pub(super) fn new(ports: Vec<String>) -> Self {
        let port = ports.first().cloned().unwrap_or_default();
        Self { ports, port }
    }

    pub(super) fn show(&mut self, ctx: &egui::Context) -> DialogOutcome<String> {
        let mut outcome = DialogOutcome::Open;
        egui::Window::new("COM PORT")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                if self.ports.is_empty() {
                    ui.label("No serial ports detected. Enter COM PORT:");
                } else {
                    ui.label("Enter COM PORT:");
                    egui::ComboBox::from_id_salt("port_select")
                        .selected_text(self.port.clone())
                        .show_ui(ui, |ui| {
                            for port in &self.ports {
                                ui.selectable_value(&mut self.port, port.clone(), port.as_str());
                            }
                        });
                }

                let submitted = text_input(ui, &mut self.port);
                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() || submitted {
                        outcome = DialogOutcome::Accepted(self.port.trim().to_owned());
                    }
                    if ui.button("Cancel").clicked() {
                        outcome = DialogOutcome::Cancelled;
                    }
                });
            });
        outcome
    }
}

/// Asks for the scale factor sent with `ATSCALE`.
#[derive(Default)]
pub(super) struct ScaleDialog {
    scale: String,
}

impl ScaleDialog {
    pub(super) fn show(&mut self, ctx: &egui::Context) -> DialogOutcome<String> {
        let mut outcome = DialogOutcome::Open;
        egui::Window::new("SET SCALE")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label("Enter scale (e.g. 10.013)");
                let submitted = text_input(ui, &mut self.scale);
                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() || submitted {
                        outcome = DialogOutcome::Accepted(self.scale.clone());
                    }
                    if ui.button("Cancel").clicked() {
                        outcome = DialogOutcome::Cancelled;
                    }
                });
            });
        outcome
    }
}

/// Single-line text field; returns true when Enter was pressed in it.
fn text_input(ui: &mut egui::Ui, text: &mut String) -> bool {
    let response = ui.text_edit_singleline(text);
    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter))
}
