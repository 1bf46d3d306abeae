// Cadence
// Copyright (C) 2025 Throneless Tech

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use cadence_common::error::Result;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_log::AsTrace;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::TelemetrySettings;

/// Installs the global subscriber. Spans are also exported over OTLP when an
/// endpoint is configured; the returned provider must be shut down on exit
/// to flush them.
pub fn init(
    verbose: &Verbosity<InfoLevel>,
    settings: &TelemetrySettings,
) -> Result<Option<SdkTracerProvider>> {
    let provider = match &settings.otlp_endpoint {
        Some(endpoint) => {
            let exporter = SpanExporter::builder()
                .with_http()
                .with_endpoint(endpoint)
                .build()?;
            Some(
                SdkTracerProvider::builder()
                    .with_resource(Resource::builder().with_service_name("cadence").build())
                    .with_batch_exporter(exporter)
                    .build(),
            )
        }
        None => None,
    };

    let otel = provider
        .as_ref()
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer("cadence")));

    tracing_subscriber::registry()
        .with(verbose.log_level_filter().as_trace())
        .with(tracing_subscriber::fmt::layer())
        .with(otel)
        .init();

    Ok(provider)
}

pub fn shutdown(provider: Option<SdkTracerProvider>) {
    if let Some(provider) = provider {
        if let Err(err) = provider.shutdown() {
            eprintln!("Failed to flush traces: {err}");
        }
    }
}
