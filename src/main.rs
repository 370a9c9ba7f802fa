mod config;
mod coordinator;
mod data_uri;
mod failure;
mod gemini;
mod history;
mod locale;
mod storage;
mod suggestions;
mod types;

use iced::{
    widget::{
        button, column, container, horizontal_space, image::{Handle, Image}, row, scrollable, text, text_input,
        text_input::Id, Column, Row,
    },
    Element, Length, Task, Theme, Subscription, ContentFit,
    time, clipboard,
    alignment,
    window,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use coordinator::{Coordinator, GenerationRequest};
use gemini::{GeminiClient, ImageService};
use history::History;
use storage::FileStore;
use types::{AspectRatio, GeneratedImage};

const GALLERY_COLUMNS: usize = 4;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("KHAYAL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> iced::Result {
    init_tracing();
    let config = config::Config::load();

    iced::application(App::title, App::update, App::view)
        .theme(App::theme)
        .subscription(App::subscription)
        .window(window::Settings {
            size: iced::Size::new(config.window.width as f32, config.window.height as f32),
            min_size: Some(iced::Size::new(
                config.window.min_width as f32,
                config.window.min_height as f32,
            )),
            position: window::Position::Centered,
            ..Default::default()
        })
        .run_with(App::new)
}

#[derive(Debug, Clone)]
enum Message {
    PromptChanged(String),
    AspectRatioSelected(AspectRatio),
    Generate,
    GenerationFinished(GenerationRequest, Result<Option<String>, String>),
    Enhance,
    EnhancementFinished(Result<Option<String>, String>),
    SelectHistory(String),
    UseAsReference,
    ClearReference,
    ClearHistory,
    Download,
    DownloadFinished(Result<PathBuf, String>),
    CopyPrompt,
    SuggestionCategory(&'static str),
    SuggestionPicked(&'static str),
    DismissError,
    Tick,
}

struct App {
    coordinator: Coordinator<FileStore>,
    client: Arc<GeminiClient>,
    download_dir: PathBuf,
    previews: HashMap<String, Handle>,
    suggestion_category: &'static str,
    notice: Option<String>,
    loading_frame: usize,
    input_id: Id,
}

impl App {
    fn new() -> (Self, Task<Message>) {
        let config = config::Config::load();

        let store = FileStore::new(config::Config::get_storage_dir(), config.history.storage_quota_bytes);
        tracing::debug!(dir = %store.dir().display(), "opening history store");
        let history = History::open(store, config.history.limits());

        let client = GeminiClient::with_config(&config.gemini);
        tracing::info!(model = client.image_model(), "using Gemini image model");

        let language = config.ui.language;
        let input_id = Id::unique();

        let mut app = App {
            coordinator: Coordinator::new(history, language),
            client: Arc::new(client),
            download_dir: config.download_dir(),
            previews: HashMap::new(),
            suggestion_category: suggestions::categories(language)[0].id,
            notice: None,
            loading_frame: 0,
            input_id: input_id.clone(),
        };
        app.refresh_previews();

        (app, text_input::focus(input_id))
    }

    fn title(&self) -> String {
        self.strings().title.to_string()
    }

    fn strings(&self) -> &'static locale::Strings {
        self.coordinator.language().strings()
    }

    fn is_busy(&self) -> bool {
        self.coordinator.is_generating() || self.coordinator.is_enhancing()
    }

    /// Decodes thumbnails for images on screen and drops the rest.
    fn refresh_previews(&mut self) {
        let visible: Vec<&GeneratedImage> = self
            .coordinator
            .history()
            .entries()
            .iter()
            .chain(self.coordinator.current_image())
            .chain(self.coordinator.reference_image())
            .collect();

        self.previews.retain(|id, _| visible.iter().any(|image| &image.id == id));

        for image in visible {
            if self.previews.contains_key(&image.id) {
                continue;
            }
            match data_uri::decode_image_bytes(&image.url) {
                Ok(bytes) => {
                    self.previews.insert(image.id.clone(), Handle::from_bytes(bytes));
                }
                Err(e) => tracing::warn!(id = %image.id, error = %e, "could not decode image"),
            }
        }
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PromptChanged(value) => {
                self.coordinator.set_prompt(value);
                Task::none()
            }
            Message::AspectRatioSelected(ratio) => {
                self.coordinator.set_aspect_ratio(ratio);
                Task::none()
            }
            Message::Generate => {
                if self.is_busy() {
                    return Task::none();
                }
                let Some(request) = self.coordinator.begin_generation() else {
                    return Task::none();
                };
                self.notice = None;
                self.loading_frame = 0;
                self.refresh_previews();

                let client = self.client.clone();
                Task::future(async move {
                    let outcome = client
                        .request_image(&request.prompt, request.aspect_ratio, request.reference.as_deref())
                        .await
                        .map_err(|e| format!("{:#}", e));
                    Message::GenerationFinished(request, outcome)
                })
            }
            Message::GenerationFinished(request, outcome) => {
                self.coordinator
                    .finish_generation(request, outcome.map_err(anyhow::Error::msg));
                self.refresh_previews();
                Task::none()
            }
            Message::Enhance => {
                if self.is_busy() {
                    return Task::none();
                }
                let Some(original) = self.coordinator.begin_enhancement() else {
                    return Task::none();
                };

                let client = self.client.clone();
                Task::future(async move {
                    let outcome = client
                        .request_enhancement(&original)
                        .await
                        .map_err(|e| format!("{:#}", e));
                    Message::EnhancementFinished(outcome)
                })
            }
            Message::EnhancementFinished(outcome) => {
                self.coordinator.finish_enhancement(outcome.map_err(anyhow::Error::msg));
                Task::none()
            }
            Message::SelectHistory(id) => {
                if self.coordinator.select_from_history(&id) {
                    self.notice = None;
                    self.refresh_previews();
                }
                Task::none()
            }
            Message::UseAsReference => {
                if let Some(image) = self.coordinator.current_image().cloned() {
                    self.coordinator.use_as_reference(image);
                    self.refresh_previews();
                }
                Task::none()
            }
            Message::ClearReference => {
                self.coordinator.clear_reference();
                self.refresh_previews();
                Task::none()
            }
            Message::ClearHistory => {
                self.coordinator.clear_history();
                self.refresh_previews();
                Task::none()
            }
            Message::Download => {
                let save = self.coordinator.download_current(self.download_dir.clone());
                Task::future(async move {
                    Message::DownloadFinished(save.await.map_err(|e| format!("{:#}", e)))
                })
            }
            Message::DownloadFinished(outcome) => {
                let s = self.strings();
                self.notice = Some(match outcome {
                    Ok(path) => format!("{} {}", s.saved_to, path.display()),
                    Err(message) => {
                        tracing::error!(error = %message, "download failed");
                        s.download_failed.to_string()
                    }
                });
                Task::none()
            }
            Message::CopyPrompt => match self.coordinator.current_image() {
                Some(image) => clipboard::write(image.prompt.clone()),
                None => Task::none(),
            },
            Message::SuggestionCategory(id) => {
                self.suggestion_category = id;
                Task::none()
            }
            Message::SuggestionPicked(prompt) => {
                if !self.is_busy() {
                    self.coordinator.apply_suggestion(prompt);
                }
                Task::none()
            }
            Message::DismissError => {
                self.coordinator.dismiss_error();
                Task::none()
            }
            Message::Tick => {
                self.loading_frame = (self.loading_frame + 1) % 80;
                Task::none()
            }
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        if self.is_busy() {
            time::every(Duration::from_millis(80)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }

    fn preview(&self, image: &GeneratedImage, size: f32) -> Element<'_, Message> {
        match self.previews.get(&image.id) {
            Some(handle) => Image::<Handle>::new(handle.clone())
                .width(size)
                .height(size)
                .content_fit(ContentFit::Cover)
                .into(),
            None => container(text("?"))
                .width(size)
                .height(size)
                .align_x(alignment::Horizontal::Center)
                .align_y(alignment::Vertical::Center)
                .into(),
        }
    }

    fn view_input(&self) -> Element<'_, Message> {
        let s = self.strings();
        let c = &self.coordinator;
        let generating = c.is_generating();
        let enhancing = c.is_enhancing();

        let enhance_label = if enhancing { s.enhancing } else { s.enhance };
        let enhance = button(text(enhance_label).size(13))
            .on_press_maybe((!self.is_busy() && c.has_prompt()).then_some(Message::Enhance))
            .padding([6, 14]);

        let header = row![text(s.prompt_label).size(15), horizontal_space(), enhance]
            .align_y(alignment::Vertical::Center);

        let mut input = text_input(s.prompt_placeholder, &c.prompt)
            .padding(15)
            .size(18)
            .id(self.input_id.clone());
        if !self.is_busy() {
            input = input
                .on_input(Message::PromptChanged)
                .on_submit(Message::Generate);
        }

        let counter = text(format!("{} {}", c.prompt.chars().count(), s.characters)).size(12);

        let mut content = column![header].spacing(10);

        if let Some(reference) = c.reference_image() {
            let indicator = row![
                self.preview(reference, 48.0),
                column![
                    text(s.reference_title).size(14),
                    text(s.reference_hint).size(11),
                ]
                .spacing(2),
                horizontal_space(),
                text(s.reference_active).size(11),
                button(text(s.clear_reference).size(12))
                    .on_press(Message::ClearReference)
                    .style(button::secondary),
            ]
            .spacing(12)
            .align_y(alignment::Vertical::Center);
            content = content.push(container(indicator).padding(10).style(container::bordered_box));
        }

        content = content
            .push(input)
            .push(counter)
            .push(self.view_suggestions())
            .push(text(s.aspect_ratio).size(15));

        let ratios = AspectRatio::ALL.iter().fold(Row::new().spacing(8), |ratios, ratio| {
            let selected = *ratio == c.aspect_ratio;
            ratios.push(
                button(text(ratio.as_str()).size(13))
                    .on_press_maybe((!generating).then_some(Message::AspectRatioSelected(*ratio)))
                    .padding([8, 14])
                    .style(move |theme, status| {
                        if selected {
                            button::primary(theme, status)
                        } else {
                            button::secondary(theme, status)
                        }
                    }),
            )
        });

        let generate_label = if generating { s.generating } else { s.generate };
        let generate = button(text(generate_label).size(17))
            .on_press_maybe((!self.is_busy() && c.has_prompt()).then_some(Message::Generate))
            .padding([14, 24])
            .width(Length::Fill);

        content = content.push(ratios).push(generate);

        container(content).padding(20).style(container::bordered_box).into()
    }

    fn view_suggestions(&self) -> Element<'_, Message> {
        let language = self.coordinator.language();
        let enabled = !self.is_busy();

        let tabs = suggestions::categories(language).iter().fold(
            Row::new().spacing(6).push(text(self.strings().suggestions).size(13)),
            |tabs, category| {
                let active = category.id == self.suggestion_category;
                tabs.push(
                    button(text(category.label).size(12))
                        .on_press(Message::SuggestionCategory(category.id))
                        .padding([4, 10])
                        .style(move |theme, status| {
                            if active {
                                button::primary(theme, status)
                            } else {
                                button::text(theme, status)
                            }
                        }),
                )
            },
        );

        let prompts = suggestions::category(language, self.suggestion_category)
            .prompts
            .iter()
            .fold(Column::new().spacing(4), |prompts, prompt| {
                prompts.push(
                    button(text(*prompt).size(12))
                        .on_press_maybe(enabled.then_some(Message::SuggestionPicked(*prompt)))
                        .style(button::text)
                        .width(Length::Fill),
                )
            });

        column![tabs, prompts].spacing(6).into()
    }

    fn view_result(&self) -> Element<'_, Message> {
        let s = self.strings();
        let c = &self.coordinator;

        if c.is_generating() {
            let frames = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
            let spinner = frames[self.loading_frame % frames.len()];

            return container(
                column![text(spinner).size(32), text(s.painting).size(17)]
                    .spacing(10)
                    .align_x(alignment::Horizontal::Center),
            )
            .width(Length::Fill)
            .height(Length::Fixed(360.0))
            .align_x(alignment::Horizontal::Center)
            .align_y(alignment::Vertical::Center)
            .style(container::bordered_box)
            .into();
        }

        let Some(image) = c.current_image() else {
            return container(
                column![text(s.empty_title).size(18), text(s.empty_hint).size(13)]
                    .spacing(8)
                    .align_x(alignment::Horizontal::Center),
            )
            .width(Length::Fill)
            .height(Length::Fixed(240.0))
            .align_x(alignment::Horizontal::Center)
            .align_y(alignment::Vertical::Center)
            .style(container::bordered_box)
            .into();
        };

        let picture: Element<'_, Message> = match self.previews.get(&image.id) {
            Some(handle) => Image::<Handle>::new(handle.clone())
                .width(Length::Fill)
                .height(Length::Fixed(480.0))
                .content_fit(ContentFit::Contain)
                .into(),
            None => text("?").into(),
        };

        let actions = row![
            button(text(s.use_as_reference).size(13)).on_press(Message::UseAsReference),
            button(text(s.download).size(13)).on_press(Message::Download),
            button(text(s.copy_prompt).size(13))
                .on_press(Message::CopyPrompt)
                .style(button::secondary),
        ]
        .spacing(10);

        let mut content = column![
            picture,
            text(s.used_prompt).size(12),
            text(image.prompt.as_str()).size(14),
            actions,
        ]
        .spacing(10);

        if let Some(notice) = &self.notice {
            content = content.push(text(notice.as_str()).size(12));
        }

        container(content).padding(15).style(container::bordered_box).into()
    }

    fn view_history(&self) -> Option<Element<'_, Message>> {
        let s = self.strings();
        let history = self.coordinator.history();
        if history.is_empty() {
            return None;
        }

        let header = row![
            text(s.history_title).size(20),
            horizontal_space(),
            button(text(s.clear_history).size(12))
                .on_press(Message::ClearHistory)
                .style(button::danger),
        ]
        .align_y(alignment::Vertical::Center);

        let grid = history.gallery().chunks(GALLERY_COLUMNS).fold(
            Column::new().spacing(10),
            |grid, chunk| {
                let line = chunk.iter().fold(Row::new().spacing(10), |line, entry| {
                    line.push(
                        button(self.preview(entry, 150.0))
                            .on_press(Message::SelectHistory(entry.id.clone()))
                            .padding(2)
                            .style(button::text),
                    )
                });
                grid.push(line)
            },
        );

        Some(column![header, grid].spacing(12).into())
    }

    fn view(&self) -> Element<'_, Message> {
        let s = self.strings();

        let mut content = column![text(s.title).size(28), self.view_input()]
            .spacing(20)
            .padding(20);

        if let Some(error) = self.coordinator.error() {
            let banner = row![
                text(error).style(text::danger),
                horizontal_space(),
                button(text("x").size(13))
                    .on_press(Message::DismissError)
                    .style(button::text),
            ]
            .align_y(alignment::Vertical::Center);
            content = content.push(container(banner).padding(12).style(container::bordered_box));
        }

        content = content.push(self.view_result());

        if let Some(history) = self.view_history() {
            content = content.push(history);
        }

        let content = if self.coordinator.language().is_rtl() {
            content.align_x(alignment::Horizontal::Right)
        } else {
            content
        };

        scrollable(container(content).width(Length::Fill))
            .height(Length::Fill)
            .into()
    }

    fn theme(&self) -> Theme {
        Theme::TokyoNight
    }
}
