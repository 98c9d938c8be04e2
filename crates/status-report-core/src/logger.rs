// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log line format for the reporter.
//!
//! ```text
//! STATUS_REPORT | LEVEL | [span{fields}: ]message fields
//! ```
//!
//! Collectors run inside a `collector{service=.. resource=..}` span, so a
//! failure reads as:
//!
//! ```text
//! STATUS_REPORT | ERROR | collector{service=load-balancer resource="web"}: Collector failed: No load balancer found matching 'web'
//! ```

use std::fmt;

use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

pub const LOG_PREFIX: &str = "STATUS_REPORT";

/// Silences the HTTP and TLS stacks and applies `level` to everything else.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("h2=off,hyper=off,rustls=off,{level}"))
}

#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(&mut writer, "{LOG_PREFIX} | {} | ", event.metadata().level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;
                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing::{error, info, info_span};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buffer {
        type Writer = Buffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(level: &str, emit: impl FnOnce()) -> String {
        let buffer = Buffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(env_filter(level))
            .with_writer(buffer.clone())
            .with_ansi(false)
            .event_format(Formatter)
            .finish();
        tracing::subscriber::with_default(subscriber, emit);
        buffer.contents()
    }

    #[test]
    fn test_prefix_and_level() {
        let output = capture("info", || info!("Report sent with 3 services"));
        assert_eq!(output, "STATUS_REPORT | INFO | Report sent with 3 services\n");
    }

    #[test]
    fn test_span_context_is_rendered() {
        let output = capture("info", || {
            let span = info_span!("collector", service = "cdn", resource = "E1");
            let _guard = span.enter();
            error!("Collector failed");
        });
        assert_eq!(
            output,
            "STATUS_REPORT | ERROR | collector{service=\"cdn\" resource=\"E1\"}: Collector failed\n"
        );
    }

    #[test]
    fn test_level_filter_applies() {
        let output = capture("warn", || info!("hidden"));
        assert!(output.is_empty());
    }
}
