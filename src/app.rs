use crate::config::{CoreOrientation, DisplayFlag, Settings};
use crate::data::Sample;
use crate::host::SysinfoProbe;
use crate::monitor::SmiSource;
use crate::panel::LivePanel;
use crate::reconcile::{Gauge, GpuElement, Layout, NO_GPU_TEXT};
use crate::scheduler::{spawn_sampler, SampleScheduler};
use crossbeam_channel::{bounded, Receiver};
use egui::{Color32, ProgressBar, RichText, Sense};
use log::warn;
use std::thread::JoinHandle;
use std::time::Duration;

// Window state: the sampler feed plus the elements currently on screen
pub struct SysWidgetApp {
    receiver: Receiver<Sample>,
    settings: Settings,
    live: LivePanel,
    interval: Duration,
    _sampler: JoinHandle<()>,
}

impl SysWidgetApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: Settings) -> std::io::Result<Self> {
        let (sender, receiver) = bounded(4);
        let interval = settings.sampling_interval();

        let scheduler = SampleScheduler::new(SysinfoProbe::new(), SmiSource::new());
        let sampler = spawn_sampler(scheduler, interval, sender)?;

        let mut style = (*cc.egui_ctx.style()).clone();
        style.visuals.dark_mode = true;
        cc.egui_ctx.set_style(style);

        Ok(Self {
            receiver,
            settings,
            live: LivePanel::new(),
            interval,
            _sampler: sampler,
        })
    }

    fn replace_settings(&mut self, next: Settings) {
        if let Err(e) = next.save() {
            warn!("failed to save settings: {e}");
        }
        self.live.relayout(Layout::from(&next));
        self.settings = next;
    }

    fn menu(&self, ui: &mut egui::Ui) -> Option<Settings> {
        let mut next = None;
        ui.label(RichText::new("Display").strong());
        for flag in DisplayFlag::ALL {
            let mut on = self.settings.flag(flag);
            if ui.checkbox(&mut on, flag.label()).changed() {
                next = Some(self.settings.with_flag(flag, on));
            }
        }
        ui.separator();
        if ui.button("Toggle Core Orientation").clicked() {
            let orientation = self.settings.core_orientation.toggled();
            next = Some(self.settings.with_orientation(orientation));
        }
        if ui.button("Exit").clicked() {
            ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
        }
        next
    }

    fn draw(&self, ui: &mut egui::Ui) {
        let panel = self.live.panel();
        ui.heading("System Monitor");

        if self.settings.show_cpu {
            ui.label("CPU (per-core):");
            if panel.cores.is_empty() {
                ui.label("CPU: N/A");
            }
            match self.settings.core_orientation {
                CoreOrientation::Horizontal => {
                    egui::ScrollArea::horizontal()
                        .id_salt("cpu_strip")
                        .show(ui, |ui| {
                            ui.horizontal(|ui| {
                                for core in &panel.cores {
                                    ui.push_id(core.id, |ui| {
                                        ui.vertical(|ui| {
                                            vertical_bar(ui, core.value.bar_value());
                                            ui.small(core.value.label(CoreOrientation::Horizontal));
                                        });
                                    });
                                }
                            });
                        });
                }
                CoreOrientation::Vertical => {
                    for core in &panel.cores {
                        ui.push_id(core.id, |ui| {
                            ui.add(
                                ProgressBar::new(core.value.percent / 100.0)
                                    .text(core.value.label(CoreOrientation::Vertical)),
                            );
                        });
                    }
                }
            }
            ui.add_space(6.0);
        }

        if let Some(ram) = &panel.ram {
            gauge(ui, &ram.gauge());
            ui.add_space(6.0);
        }

        for element in &panel.gpus {
            ui.push_id(element.id, |ui| match &element.value {
                GpuElement::Placeholder => {
                    ui.label(NO_GPU_TEXT);
                }
                GpuElement::Device(reading) => {
                    ui.label(RichText::new(&reading.title).strong());
                    if let Some(core) = &reading.core {
                        gauge(ui, core);
                    }
                    if let Some(vram) = &reading.vram {
                        gauge(ui, vram);
                    }
                    if let Some(meta) = &reading.meta {
                        ui.label(meta.as_str());
                    }
                }
            });
        }
    }
}

fn gauge(ui: &mut egui::Ui, gauge: &Gauge) {
    ui.label(gauge.text.as_str());
    ui.add(ProgressBar::new(f32::from(gauge.value) / 100.0));
}

fn vertical_bar(ui: &mut egui::Ui, value: u8) {
    let (rect, _) = ui.allocate_exact_size(egui::vec2(16.0, 64.0), Sense::hover());
    let painter = ui.painter();
    painter.rect_filled(rect, 3.0, ui.visuals().extreme_bg_color);

    let height = rect.height() * f32::from(value) / 100.0;
    let filled =
        egui::Rect::from_min_max(egui::pos2(rect.left(), rect.bottom() - height), rect.max);
    painter.rect_filled(filled, 3.0, Color32::from_rgb(76, 175, 80));
}

impl eframe::App for SysWidgetApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let layout = Layout::from(&self.settings);
        while let Ok(sample) = self.receiver.try_recv() {
            self.live.ingest(sample, layout);
        }

        let mut next = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            let background =
                ui.interact(ui.max_rect(), ui.id().with("background"), Sense::click());
            background.context_menu(|ui| next = self.menu(ui));

            egui::ScrollArea::vertical().show(ui, |ui| self.draw(ui));
        });

        if let Some(settings) = next {
            self.replace_settings(settings);
        }

        ctx.request_repaint_after(self.interval / 2);
    }
}
