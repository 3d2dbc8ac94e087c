use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::{ClientConfig, TemplateSource};
use crate::controller::{ActionKind, Controller, ControllerSpec, PARALLEL_SERVER, SINGLE_SERVER};
use crate::dispatch::{Dispatcher, Transport};
use crate::error::{Error, Result};
use crate::events::EventRouter;
use crate::page::{Page, Selector};
use crate::state::Outcome;
use crate::templates::Templates;

pub fn controller_specs() -> [&'static ControllerSpec; 2] {
    [&SINGLE_SERVER, &PARALLEL_SERVER]
}

/// A user interaction: fill the page, then press a control.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Fill {
        form: Selector,
        field: &'static str,
        value: String,
    },
    Attach {
        form: Selector,
        path: PathBuf,
    },
    Check {
        checkbox: Selector,
        checked: bool,
    },
    Trigger(Selector),
    Confirm,
}

pub struct App {
    page: Page,
    router: EventRouter,
    controllers: Vec<Controller>,
}

impl App {
    /// Loads the templates, and only then builds the page and initializes
    /// every controller once.
    pub async fn bootstrap(config: &ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let dispatcher = Dispatcher::new(transport);
        let templates = Arc::new(match config.templates {
            TemplateSource::Remote => Templates::load(&dispatcher).await?,
            TemplateSource::Builtin => Templates::builtin()?,
        });

        let mut page = Page::new(config.flash.board()?);
        let mut router = EventRouter::default();
        let controllers = controller_specs()
            .into_iter()
            .map(|spec| {
                Controller::new(
                    spec,
                    dispatcher.clone(),
                    Arc::clone(&templates),
                    config.download_dir.clone(),
                    config.fetch_plots,
                )
            })
            .collect::<Vec<_>>();
        for (index, controller) in controllers.iter().enumerate() {
            controller.init(index, &mut page, &mut router)?;
        }
        info!(
            base_url = %config.base_url,
            controls = router.len(),
            "page ready"
        );

        Ok(Self {
            page,
            router,
            controllers,
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Re-runs init for every controller; always fails on the first bound
    /// control.
    pub fn reinit(&mut self) -> Result<()> {
        for (index, controller) in self.controllers.iter().enumerate() {
            controller.init(index, &mut self.page, &mut self.router)?;
        }
        Ok(())
    }

    pub async fn trigger(&mut self, control: &str) -> Result<Outcome> {
        self.page.flash.sweep(Utc::now());
        let binding = self.router.resolve(control)?;
        let controller = self
            .controllers
            .get_mut(binding.controller)
            .ok_or_else(|| Error::UnboundControl(control.to_string()))?;
        debug!(control, action = %binding.action, "trigger");
        controller.handle(binding.action, &mut self.page).await
    }

    /// Presses the confirm control of whichever controller owns the open
    /// confirmation modal.
    pub async fn confirm_open_modal(&mut self) -> Result<Outcome> {
        let open = self.page.open_modals().collect::<Vec<_>>();
        let control = self
            .controllers
            .iter()
            .filter(|controller| open.contains(&controller.spec().modal))
            .find_map(|controller| controller.spec().action(ActionKind::ConfirmClear))
            .map(|action| action.control)
            .ok_or(Error::ConfirmationNotRequested)?;
        self.trigger(control).await
    }

    pub fn cancel_modals(&mut self) {
        let open = self.page.open_modals().collect::<Vec<_>>();
        for modal in open {
            self.page.close_modal(modal);
        }
    }

    /// Applies each step in order; returns the outcome of the last control
    /// pressed.
    pub async fn perform(&mut self, steps: &[Step]) -> Result<Option<Outcome>> {
        let mut last = None;
        for step in steps {
            match step {
                Step::Fill { form, field, value } => {
                    self.page.form_mut(form)?.set(field, value);
                }
                Step::Attach { form, path } => {
                    let bytes = tokio::fs::read(path).await.map_err(|err| {
                        Error::Io(format!("failed to read '{}': {}", path.display(), err))
                    })?;
                    let file_name = path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .unwrap_or("upload")
                        .to_string();
                    self.page.form_mut(form)?.attach("file", &file_name, bytes);
                }
                Step::Check { checkbox, checked } => {
                    self.page.set_checked(*checkbox, *checked);
                }
                Step::Trigger(control) => {
                    last = Some(self.trigger(control).await?);
                }
                Step::Confirm => {
                    last = Some(self.confirm_open_modal().await?);
                }
            }
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{parallel, single};
    use crate::dispatch::Body;
    use crate::testing::ScriptedTransport;
    use serde_json::json;

    async fn app(transport: Arc<ScriptedTransport>) -> App {
        let config = ClientConfig {
            templates: TemplateSource::Builtin,
            ..ClientConfig::default()
        };
        App::bootstrap(&config, transport).await.unwrap()
    }

    #[tokio::test]
    async fn bootstrap_binds_every_action_control() {
        let app = app(ScriptedTransport::new()).await;
        let actions = controller_specs()
            .iter()
            .map(|spec| spec.actions.len())
            .sum::<usize>();
        assert_eq!(app.router().len(), actions);
        assert!(app.page().table(single::EVENT_TABLE).is_some());
        assert!(app.page().table(parallel::SERVERS_TABLE).is_some());
    }

    #[tokio::test]
    async fn builtin_bootstrap_sends_no_requests() {
        let transport = ScriptedTransport::new();
        let _app = app(transport.clone()).await;
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn remote_bootstrap_fetches_every_template() {
        let transport = ScriptedTransport::new();
        for name in crate::templates::TemplateName::ALL {
            transport.push_bytes(&name.path(), name.builtin_source().as_bytes());
        }
        let config = ClientConfig::default();
        App::bootstrap(&config, transport.clone()).await.unwrap();

        assert_eq!(
            transport.requests().len(),
            crate::templates::TemplateName::ALL.len()
        );
    }

    #[tokio::test]
    async fn reinit_fails_on_first_bound_control() {
        let mut app = app(ScriptedTransport::new()).await;
        let err = app.reinit().unwrap_err();
        assert!(matches!(err, Error::AlreadyBound(_)));
    }

    #[tokio::test]
    async fn unknown_control_is_rejected() {
        let mut app = app(ScriptedTransport::new()).await;
        let err = app.trigger("#launchButton").await.unwrap_err();
        assert_eq!(err.to_string(), "no action bound to control '#launchButton'");
    }

    #[tokio::test]
    async fn confirm_goes_to_the_controller_owning_the_open_modal() {
        let transport = ScriptedTransport::new();
        transport.push_status("/clear_data_parallel", 200);
        let mut app = app(transport.clone()).await;

        app.trigger(parallel::CLEAR_BUTTON).await.unwrap();
        let outcome = app.confirm_open_modal().await.unwrap();

        assert_eq!(outcome, Outcome::Rendered);
        assert_eq!(transport.paths(), vec!["/clear_data_parallel".to_string()]);
        assert_eq!(app.page().open_modals().count(), 0);
    }

    #[tokio::test]
    async fn cancel_closes_the_dialog_without_a_request() {
        let transport = ScriptedTransport::new();
        let mut app = app(transport.clone()).await;

        app.trigger(single::CLEAR_BUTTON).await.unwrap();
        app.cancel_modals();

        assert!(!app.page().is_modal_open(single::CLEAR_MODAL));
        assert!(matches!(
            app.confirm_open_modal().await,
            Err(Error::ConfirmationNotRequested)
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn perform_fills_the_form_then_presses() {
        let transport = ScriptedTransport::new();
        transport.push_json(
            "/add_server",
            json!({"success": true, "events": [{"Server No.": 1, "Service Time": 4}]}),
        );
        let mut app = app(transport.clone()).await;

        let outcome = app
            .perform(&[
                Step::Fill {
                    form: parallel::ADD_SERVER_FORM,
                    field: "server_no",
                    value: "1".to_string(),
                },
                Step::Fill {
                    form: parallel::ADD_SERVER_FORM,
                    field: "service_time",
                    value: "4".to_string(),
                },
                Step::Trigger(parallel::ADD_SERVER_BUTTON),
            ])
            .await
            .unwrap();

        assert_eq!(outcome, Some(Outcome::Rendered));
        assert_eq!(app.page().table_len(parallel::SERVER_TABLE), 1);
        match &transport.requests()[0].body {
            Body::Multipart(form) => assert_eq!(
                form.fields,
                vec![
                    ("server_no".to_string(), "1".to_string()),
                    ("service_time".to_string(), "4".to_string()),
                ]
            ),
            other => panic!("expected multipart body, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn attach_reads_the_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("services.xlsx");
        std::fs::write(&path, b"sheet").unwrap();
        let transport = ScriptedTransport::new();
        transport.push_json("/upload_file", json!({"data": []}));
        let mut app = app(transport.clone()).await;

        app.perform(&[
            Step::Attach {
                form: single::UPLOAD_FORM,
                path,
            },
            Step::Trigger(single::UPLOAD_BUTTON),
        ])
        .await
        .unwrap();

        match &transport.requests()[0].body {
            Body::Multipart(form) => {
                assert_eq!(form.files[0].field, "file");
                assert_eq!(form.files[0].file_name, "services.xlsx");
                assert_eq!(form.files[0].bytes, b"sheet");
            }
            other => panic!("expected multipart body, got {:?}", other),
        }
    }
}
