//! Headless Chromium engine over the DevTools protocol (`chromiumoxide`).
//!
//! One [`ChromiumSession`] owns one browser process plus the task that pumps
//! its CDP event stream. Each [`ChromiumContext`] is a browser tab.
//!
//! The browser sits behind an `RwLock<Option<Browser>>`: opening tabs takes
//! the read side (tabs can be opened concurrently), dispose takes the write
//! side once and leaves `None` behind.

use super::{
    EngineContext, EngineError, EngineResult, EngineSession, ImageState, PrintOptions,
    RenderingEngine,
};
use crate::config::EngineConfig;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::{NavigateParams, PrintToPdfParams};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// How often the parse probe is re-evaluated after navigation.
const PARSE_POLL_INTERVAL: Duration = Duration::from_millis(25);

fn protocol(e: impl std::fmt::Display) -> EngineError {
    EngineError::Protocol(e.to_string())
}

/// Launches local Chrome/Chromium processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumEngine;

#[async_trait]
impl RenderingEngine for ChromiumEngine {
    async fn launch(&self, config: &EngineConfig) -> EngineResult<Arc<dyn EngineSession>> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .launch_timeout(config.launch_timeout)
            .args(config.args());
        if let Some(ref exe) = config.executable {
            builder = builder.chrome_executable(exe);
        }
        let browser_config = builder.build().map_err(EngineError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| EngineError::Launch(e.to_string()))?;

        // The handler must be polled for any CDP call to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {}", e);
                }
            }
            debug!("CDP handler stream ended");
        });

        info!("Chromium session started");
        Ok(Arc::new(ChromiumSession {
            browser: RwLock::new(Some(browser)),
            handler_task: Mutex::new(Some(handler_task)),
            disposed: Arc::new(AtomicBool::new(false)),
        }))
    }
}

/// One running browser process.
pub struct ChromiumSession {
    browser: RwLock<Option<Browser>>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
    disposed: Arc<AtomicBool>,
}

#[async_trait]
impl EngineSession for ChromiumSession {
    async fn open_context(&self) -> EngineResult<Box<dyn EngineContext>> {
        if self.is_disposed() {
            return Err(EngineError::Disposed);
        }
        let guard = self.browser.read().await;
        let browser = guard.as_ref().ok_or(EngineError::Disposed)?;
        let page = browser.new_page("about:blank").await.map_err(protocol)?;
        Ok(Box::new(ChromiumContext {
            page,
            disposed: Arc::clone(&self.disposed),
        }))
    }

    async fn dispose(&self) -> EngineResult<()> {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut result = Ok(());
        if let Some(mut browser) = self.browser.write().await.take() {
            if let Err(e) = browser.close().await {
                warn!("Chromium close failed: {}", e);
                result = Err(protocol(e));
            }
            if let Err(e) = browser.wait().await {
                debug!("Chromium wait failed: {}", e);
            }
        }
        if let Some(task) = self.handler_task.lock().await.take() {
            task.abort();
        }

        info!("Chromium session disposed");
        result
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // Browser's own Drop kills the child; only the pump task is left.
        if let Ok(mut task) = self.handler_task.try_lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}

/// One browser tab.
pub struct ChromiumContext {
    page: Page,
    disposed: Arc<AtomicBool>,
}

impl ChromiumContext {
    fn ensure_live(&self) -> EngineResult<()> {
        if self.disposed.load(Ordering::SeqCst) {
            Err(EngineError::Disposed)
        } else {
            Ok(())
        }
    }
}

/// JS expression that is true once `document` is the navigated file and has
/// left the `loading` state (DOMContentLoaded semantics).
fn parse_probe(url: &Url) -> EngineResult<String> {
    let name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let name = serde_json::to_string(name).map_err(protocol)?;
    Ok(format!(
        "document.URL.endsWith({name}) && document.readyState !== 'loading'"
    ))
}

/// Promise resolving to `"load"` or `"error"` for `document.images[index]`.
fn image_probe(index: usize) -> String {
    format!(
        r#"new Promise((resolve) => {{
  const img = document.images[{index}];
  if (!img) {{ resolve("error"); return; }}
  if (img.complete) {{ resolve(img.naturalWidth > 0 ? "load" : "error"); return; }}
  img.addEventListener("load", () => resolve("load"), {{ once: true }});
  img.addEventListener("error", () => resolve("error"), {{ once: true }});
}})"#
    )
}

#[async_trait]
impl EngineContext for ChromiumContext {
    async fn navigate(&self, url: &Url) -> EngineResult<()> {
        self.ensure_live()?;
        let response = self
            .page
            .execute(NavigateParams::new(url.as_str()))
            .await
            .map_err(protocol)?;
        if let Some(ref error_text) = response.result.error_text {
            return Err(EngineError::Navigation(error_text.clone()));
        }

        let probe = parse_probe(url)?;
        loop {
            self.ensure_live()?;
            match self.page.evaluate(probe.as_str()).await {
                Ok(v) => {
                    if v.into_value::<bool>().unwrap_or(false) {
                        return Ok(());
                    }
                }
                // The execution context is swapped during navigation.
                Err(e) => debug!("parse probe not ready: {}", e),
            }
            tokio::time::sleep(PARSE_POLL_INTERVAL).await;
        }
    }

    async fn image_count(&self) -> EngineResult<usize> {
        self.ensure_live()?;
        self.page
            .evaluate("document.images.length")
            .await
            .map_err(protocol)?
            .into_value::<usize>()
            .map_err(protocol)
    }

    async fn wait_for_image(&self, index: usize) -> EngineResult<ImageState> {
        self.ensure_live()?;
        let params = EvaluateParams::builder()
            .expression(image_probe(index))
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(EngineError::Protocol)?;
        let state = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(protocol)?
            .into_value::<String>()
            .map_err(protocol)?;
        Ok(if state == "load" {
            ImageState::Loaded
        } else {
            ImageState::Errored
        })
    }

    async fn print_pdf(&self, options: &PrintOptions) -> EngineResult<Vec<u8>> {
        self.ensure_live()?;
        let params = PrintToPdfParams {
            paper_width: Some(options.paper_width),
            paper_height: Some(options.paper_height),
            margin_top: Some(options.margin_top),
            margin_right: Some(options.margin_right),
            margin_bottom: Some(options.margin_bottom),
            margin_left: Some(options.margin_left),
            print_background: Some(options.print_background),
            display_header_footer: Some(options.has_overlays()),
            header_template: options.header_or_blank(),
            footer_template: options.footer_or_blank(),
            prefer_css_page_size: Some(false),
            ..Default::default()
        };
        self.page.pdf(params).await.map_err(protocol)
    }

    async fn close(self: Box<Self>) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.page.close().await {
            debug!("closing tab failed: {}", e);
        }
    }
}
