//! Diagnostic HTTP server for ESP32.
//!
//! # Endpoints
//!
//! - `GET /id` - Application identifier (text/plain)
//! - `POST /update` - Raw firmware image, written to the inactive OTA slot
//!
//! The esp-idf httpd answers requests on its own task. A completed upload
//! only raises a flag; the restart itself happens from the control loop in
//! [`DiagnosticResponder::service`], so it never interrupts a publish.
//!
//! # Example
//!
//! ```ignore
//! use sensor_node::hal::esp32::Esp32HttpServer;
//! use sensor_node::config::WebConfig;
//!
//! let server = Esp32HttpServer::new(&WebConfig::default(), "336141")?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use esp_idf_svc::http::server::{Configuration, EspHttpConnection, EspHttpServer, Request};
use esp_idf_svc::http::Method;
use esp_idf_svc::io::{Read, Write};
use esp_idf_svc::ota::EspOta;
use log::{error, info};

use crate::config::{ShortString, WebConfig};
use crate::diagnostics::{respond, DiagnosticsError, APP_ID_PATH, FIRMWARE_UPDATE_PATH};
use crate::traits::{DiagnosticResponder, HttpMethod, HttpRequest};

const OTA_CHUNK_SIZE: usize = 1024;

/// Diagnostic and firmware-update endpoint.
pub struct Esp32HttpServer {
    _server: EspHttpServer<'static>,
    restart_pending: Arc<AtomicBool>,
    last_failure: Arc<Mutex<Option<String>>>,
}

impl Esp32HttpServer {
    /// Start the server on the configured port.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP server fails to start or a handler
    /// cannot be registered.
    pub fn new(config: &WebConfig, app_id: &str) -> anyhow::Result<Self> {
        let server_config = Configuration {
            http_port: config.port,
            stack_size: 10 * 1024,
            ..Default::default()
        };

        let mut server = EspHttpServer::new(&server_config)?;
        let restart_pending = Arc::new(AtomicBool::new(false));
        let last_failure = Arc::new(Mutex::new(None));

        let app_id: ShortString = crate::config::short_string(app_id);
        server.fn_handler::<anyhow::Error, _>(APP_ID_PATH, Method::Get, move |req| {
            let response = respond(&HttpRequest::new(HttpMethod::Get, req.uri()), &app_id);
            req.into_response(response.status, None, &[("Content-Type", response.content_type)])?
                .write_all(&response.body)?;
            Ok(())
        })?;

        {
            let restart_pending = Arc::clone(&restart_pending);
            let last_failure = Arc::clone(&last_failure);
            server.fn_handler::<anyhow::Error, _>(FIRMWARE_UPDATE_PATH, Method::Post, move |mut req| {
                match receive_image(&mut req) {
                    Ok(written) => {
                        info!("firmware image received ({} bytes), restart pending", written);
                        restart_pending.store(true, Ordering::Release);
                        req.into_ok_response()?.write_all(b"OK")?;
                    }
                    Err(e) => {
                        let message = format!("{:#}", e);
                        error!("firmware update failed: {}", message);
                        req.into_response(500, None, &[("Content-Type", "text/plain")])?
                            .write_all(message.as_bytes())?;
                        if let Ok(mut slot) = last_failure.lock() {
                            *slot = Some(message);
                        }
                    }
                }
                Ok(())
            })?;
        }

        info!("diagnostic server listening on port {}", config.port);

        Ok(Self {
            _server: server,
            restart_pending,
            last_failure,
        })
    }
}

impl DiagnosticResponder for Esp32HttpServer {
    type Error = DiagnosticsError;

    fn service(&mut self) -> Result<(), DiagnosticsError> {
        if self.restart_pending.load(Ordering::Acquire) {
            info!("restarting into new firmware");
            // let the upload response drain before the socket goes away
            thread::sleep(Duration::from_millis(100));
            esp_idf_hal::reset::restart();
        }

        let failure = self.last_failure.lock().ok().and_then(|mut slot| slot.take());
        match failure {
            Some(message) => Err(DiagnosticsError::Update(message)),
            None => Ok(()),
        }
    }
}

/// Stream the request body into the next OTA slot.
fn receive_image(req: &mut Request<&mut EspHttpConnection<'_>>) -> anyhow::Result<usize> {
    let mut ota = EspOta::new()?;
    let mut update = ota.initiate_update()?;

    let mut chunk = [0u8; OTA_CHUNK_SIZE];
    let mut written = 0usize;
    loop {
        let read = req.read(&mut chunk).map_err(|e| anyhow!("{:?}", e))?;
        if read == 0 {
            break;
        }
        update.write(&chunk[..read])?;
        written += read;
    }

    if written == 0 {
        update.abort()?;
        return Err(anyhow!("firmware image is empty"));
    }

    update.complete()?;
    Ok(written)
}
