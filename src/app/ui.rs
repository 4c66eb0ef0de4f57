use super::{AuthState, StreamerUploader};
use crate::files::{batch_from_folder, batch_from_paths, format_size};
use crate::selection::{DataType, LabelField};
use crate::upload::JobStatus;
use eframe::egui::{self, Align, Align2, Color32, RichText};
use rfd::FileDialog;

const ACCENT: Color32 = Color32::from_rgb(24, 144, 255);
const SUCCESS: Color32 = Color32::from_rgb(82, 196, 26);
const DANGER: Color32 = Color32::from_rgb(220, 50, 50);
const MUTED: Color32 = Color32::from_rgb(150, 150, 150);

impl StreamerUploader {
    pub fn render(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let footer_height = 40.0;
            let content_height = ui.available_height() - footer_height;

            egui::ScrollArea::vertical()
                .max_height(content_height)
                .show(ui, |ui| {
                    ui.add_space(20.0);
                    ui.vertical_centered(|ui| {
                        ui.heading("Research Data Uploader");
                        ui.add_space(5.0);
                        ui.label(
                            RichText::new("Upload your data files to project storage")
                                .color(ui.visuals().text_color().gamma_multiply(0.7)),
                        );
                    });
                    ui.add_space(20.0);

                    if self.auth.is_authenticated() {
                        self.render_workspace(ui);
                    } else {
                        self.render_login(ui);
                    }
                });

            ui.with_layout(egui::Layout::bottom_up(Align::Center), |ui| {
                ui.add_space(10.0);
                self.render_footer(ui);
            });
        });

        self.render_upload_modal(ctx);
        self.render_error_modal(ctx);
    }

    fn render_login(&mut self, ui: &mut egui::Ui) {
        let logging_in = matches!(self.auth, AuthState::LoggingIn);

        ui.vertical_centered(|ui| {
            ui.group(|ui| {
                ui.set_max_width(320.0);
                ui.add_enabled_ui(!logging_in, |ui| {
                    ui.label("Username");
                    ui.text_edit_singleline(&mut self.login_form.username);
                    ui.add_space(8.0);
                    ui.label("Password");
                    let password = ui.add(
                        egui::TextEdit::singleline(&mut self.login_form.password).password(true),
                    );
                    let submitted =
                        password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    ui.add_space(12.0);

                    let button = egui::Button::new("Log in").min_size(egui::vec2(200.0, 32.0));
                    if ui.add(button).clicked() || submitted {
                        self.start_login();
                    }
                });

                if logging_in {
                    ui.add(egui::Spinner::new());
                }
                if let Some(error) = &self.login_form.error {
                    ui.colored_label(DANGER, error);
                }
            });
        });
    }

    fn render_workspace(&mut self, ui: &mut egui::Ui) {
        let locked = self.upload.batch.is_some();
        ui.add_enabled_ui(!locked, |ui| {
            ui.columns(2, |columns| {
                self.render_local_files(&mut columns[0]);
                self.render_destination(&mut columns[1]);
            });
        });
    }

    fn render_local_files(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.heading("Local PC");
            ui.separator();

            ui.horizontal(|ui| {
                if ui.button("📄 Select Files").clicked() {
                    if let Some(paths) = FileDialog::new().pick_files() {
                        self.add_batch(batch_from_paths(&paths));
                    }
                }
                if ui.button("📁 Select Folder").clicked() {
                    if let Some(folder) = FileDialog::new().pick_folder() {
                        self.add_batch(batch_from_folder(&folder));
                    }
                }
            });
            ui.label(
                RichText::new("Files listed in .gitignore are skipped when selecting a folder")
                    .small()
                    .color(MUTED),
            );
            ui.add_space(10.0);

            if self.registry.is_empty() {
                ui.label("No files selected");
                return;
            }

            let mut to_remove = None;
            egui::ScrollArea::vertical()
                .id_source("file_list")
                .max_height(300.0)
                .show(ui, |ui| {
                    for file in self.registry.files() {
                        ui.horizontal(|ui| {
                            if ui.small_button("🗑").on_hover_text("Remove").clicked() {
                                to_remove = Some((file.uid.clone(), file.name.clone(), file.size));
                            }
                            ui.label(&file.name);
                            ui.label(RichText::new(format_size(file.size)).color(MUTED));
                        });
                    }
                });
            if let Some((uid, name, size)) = to_remove {
                self.remove_file(&uid, &name, size);
            }

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.label(format!(
                    "{} files, {} total",
                    self.registry.len(),
                    format_size(self.registry.total_size())
                ));
                if ui.button("Clear list").clicked() {
                    self.clear_files();
                }
            });
        });
    }

    fn render_destination(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.heading("Project storage");
                ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                    ui.label(RichText::new(self.selection.path().to_string()).color(ACCENT));
                });
            });
            ui.separator();

            if let AuthState::LoadingProjects(session) = &self.auth {
                ui.label(format!("Loading projects for {} ...", session.username()));
                ui.add(egui::Spinner::new());
                return;
            }

            self.render_project_picker(ui);

            if self.selection.subject_unlocked() {
                self.render_label_input(ui, LabelField::Subject, "Set subject label");
            }
            if self.selection.session_unlocked() {
                self.render_label_input(ui, LabelField::Session, "Set session label");
            }
            if self.selection.data_type_unlocked() {
                self.render_data_type_picker(ui);
            }
            if self.selection.data_type_other_unlocked() {
                self.render_label_input(ui, LabelField::DataTypeOther, "Insert other data type");
            }

            ui.add_space(20.0);
            ui.with_layout(egui::Layout::right_to_left(Align::Min), |ui| {
                let can_upload = self.can_upload();
                let mut button = egui::Button::new(RichText::new("📤 Upload").strong())
                    .min_size(egui::vec2(200.0, 40.0));
                if can_upload {
                    button = button.fill(SUCCESS);
                }
                if ui.add_enabled(can_upload, button).clicked() {
                    self.start_upload();
                }
            });
        });
    }

    fn render_project_picker(&mut self, ui: &mut egui::Ui) {
        let current = self.selection.path().project_number;
        let mut picked = None;

        ui.horizontal(|ui| {
            egui::ComboBox::from_label("Project number")
                .selected_text(current.as_deref().unwrap_or("Select project"))
                .width(260.0)
                .show_ui(ui, |ui| {
                    for project in &self.projects {
                        let selected = current.as_deref() == Some(project.number.as_str());
                        if ui.selectable_label(selected, &project.number).clicked() {
                            picked = Some(project.number.clone());
                        }
                    }
                });
            ui.label("ℹ").on_hover_text(
                "only the projects are shown for which you are manager or contributor",
            );
        });

        if let Some(number) = picked {
            self.select_project(number);
        }
    }

    fn render_label_input(&mut self, ui: &mut egui::Ui, field: LabelField, hint: &str) {
        ui.add_space(8.0);
        let changed = ui
            .horizontal(|ui| {
                let input = &mut self.inputs.get_mut(field).text;
                let response = ui.add(
                    egui::TextEdit::singleline(input)
                        .hint_text(hint)
                        .desired_width(260.0),
                );
                ui.label("ℹ")
                    .on_hover_text(format!("{} must be of form {}", field, field.pattern()));
                response.changed()
            })
            .inner;

        if changed {
            self.change_label(field);
        }
        if let Some(error) = &self.inputs.get(field).error {
            ui.colored_label(DANGER, error);
        }
    }

    fn render_data_type_picker(&mut self, ui: &mut egui::Ui) {
        ui.add_space(8.0);
        let current = self.selection.selected_data_type().map(str::to_string);
        let mut picked = None;

        egui::ComboBox::from_label("Data type")
            .selected_text(current.as_deref().unwrap_or("Select data type"))
            .width(260.0)
            .show_ui(ui, |ui| {
                for choice in DataType::choices() {
                    if ui
                        .selectable_label(current.as_deref() == Some(choice), choice)
                        .clicked()
                    {
                        picked = Some(choice);
                    }
                }
            });

        if let Some(choice) = picked {
            self.select_data_type(choice);
        }
    }

    fn render_upload_modal(&mut self, ctx: &egui::Context) {
        if self.upload.batch.is_none() {
            return;
        }
        let uploading = self.upload.is_uploading();
        let failed = self
            .upload
            .batch
            .as_ref()
            .is_some_and(|batch| batch.overall_failed());

        egui::Window::new("Uploading")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                let fill = if failed { DANGER } else { ACCENT };
                ui.add(
                    egui::ProgressBar::new(self.upload.progress_fraction())
                        .show_percentage()
                        .fill(fill),
                );
                ui.label(self.upload.status_text());

                if uploading {
                    ui.label("This may take a while ...");
                    ui.label(RichText::new("Do not close the window").strong());
                    ui.add(egui::Spinner::new());
                } else if failed {
                    ui.colored_label(DANGER, "Failed");
                } else {
                    ui.colored_label(SUCCESS, "Done");
                }

                self.render_details(ui);

                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    ui.add_enabled_ui(!uploading, |ui| {
                        if ui.button("Upload another batch").clicked() {
                            self.upload_another_batch();
                        }
                        if ui.button("Log out").clicked() {
                            self.log_out();
                        }
                    });
                });
            });
    }

    fn render_details(&mut self, ui: &mut egui::Ui) {
        let Some(batch) = &self.upload.batch else {
            return;
        };
        if ui
            .button(if self.upload.show_details {
                "Hide Details"
            } else {
                "Show Details"
            })
            .clicked()
        {
            self.upload.show_details = !self.upload.show_details;
        }
        if !self.upload.show_details {
            return;
        }

        egui::ScrollArea::vertical()
            .id_source("upload_details")
            .max_height(200.0)
            .show(ui, |ui| {
                for job in batch.jobs() {
                    ui.horizontal(|ui| match &job.status {
                        JobStatus::Pending => {
                            ui.label("⏸");
                            ui.colored_label(MUTED, &job.name);
                        }
                        JobStatus::InFlight => {
                            ui.label("⏳");
                            ui.colored_label(MUTED, format!("{} - Uploading...", job.name));
                        }
                        JobStatus::Done => {
                            ui.label("✅");
                            ui.colored_label(SUCCESS, &job.name);
                        }
                        JobStatus::Failed(reason) => {
                            ui.label("❌");
                            ui.colored_label(DANGER, format!("{} - {}", job.name, reason));
                        }
                    });
                }
            });
    }

    fn render_error_modal(&mut self, ctx: &egui::Context) {
        let Some(message) = self.errors.message().map(str::to_string) else {
            return;
        };
        egui::Window::new("Error")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.colored_label(DANGER, &message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    self.errors.dismiss();
                }
            });
    }

    fn render_footer(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if let Some(session) = self.auth.session() {
                ui.label(format!("Logged in as {}", session.username()));
                ui.separator();
            }
            if ui
                .add(
                    egui::Label::new(RichText::new("Help").color(ACCENT))
                        .sense(egui::Sense::click()),
                )
                .clicked()
            {
                if let Err(e) = open::that(&self.config.help_url) {
                    tracing::warn!("Failed to open link: {}", e);
                }
            }
        });
    }
}
