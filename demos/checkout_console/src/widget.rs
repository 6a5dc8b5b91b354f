// demos/checkout_console/src/widget.rs

//! A payment widget operated from the terminal.

use async_trait::async_trait;
use std::time::Duration;
use storefront::{CheckoutWidget, GatewayFailure, GatewayTokens, WidgetCallbacks, WidgetRequest, WidgetUnavailable};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

pub const DEFAULT_SCRIPT_URL: &str = "https://checkout.razorpay.com/v1/checkout.js";

pub struct ConsoleWidget {
  script_url: String,
  http: reqwest::Client,
}

impl ConsoleWidget {
  pub fn new(script_url: impl Into<String>) -> Self {
    Self {
      script_url: script_url.into(),
      http: reqwest::Client::new(),
    }
  }
}

#[async_trait]
impl CheckoutWidget for ConsoleWidget {
  /// Probes the hosted script; a blocked or unreachable script is reported as such.
  async fn ensure_loaded(&self) -> Result<(), WidgetUnavailable> {
    let response = self
      .http
      .get(&self.script_url)
      .timeout(Duration::from_secs(5))
      .send()
      .await
      .map_err(|e| WidgetUnavailable(format!("{}: {e}", self.script_url)))?;
    if !response.status().is_success() {
      return Err(WidgetUnavailable(format!("{} returned {}", self.script_url, response.status())));
    }
    info!(script_url = %self.script_url, "checkout script reachable");
    Ok(())
  }

  async fn open(&self, request: WidgetRequest, callbacks: WidgetCallbacks) -> Result<(), WidgetUnavailable> {
    println!();
    println!("=== {} ===", request.merchant_name);
    println!("{}", request.description);
    println!(
      "Gateway order {} for {} {} (key {})",
      request.gateway_order_id, request.amount, request.currency, request.key
    );
    println!("Type `<payment_id> <signature>` once paid, `fail <reason>` to decline,");
    println!("or an empty line to close the window.");

    let order_id = request.gateway_order_id;
    tokio::spawn(async move {
      let mut line = String::new();
      let mut stdin = BufReader::new(tokio::io::stdin());
      if let Err(e) = stdin.read_line(&mut line).await {
        warn!(error = %e, "could not read from the terminal, closing the widget");
        return;
      }
      match parse_reply(&line) {
        TerminalReply::Declined(reason) => {
          callbacks.fail(GatewayFailure::new(reason));
        }
        TerminalReply::Paid { payment_id, signature } => {
          callbacks.succeed(GatewayTokens {
            order_id,
            payment_id,
            signature,
          });
        }
        // Dropping the callbacks unsettled closes the widget.
        TerminalReply::Closed => {}
      }
    });
    Ok(())
  }
}

#[derive(Debug, PartialEq, Eq)]
enum TerminalReply {
  Paid { payment_id: String, signature: String },
  Declined(String),
  Closed,
}

fn parse_reply(line: &str) -> TerminalReply {
  let mut words = line.split_whitespace();
  match words.next() {
    Some("fail") => {
      let reason = words.collect::<Vec<_>>().join(" ");
      TerminalReply::Declined(if reason.is_empty() {
        "declined at the terminal".to_string()
      } else {
        reason
      })
    }
    Some(payment_id) => match words.next() {
      Some(signature) => TerminalReply::Paid {
        payment_id: payment_id.to_string(),
        signature: signature.to_string(),
      },
      None => TerminalReply::Closed,
    },
    None => TerminalReply::Closed,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decline_keeps_the_whole_reason() {
    assert_eq!(parse_reply("fail card declined\n"), TerminalReply::Declined("card declined".into()));
    assert_eq!(parse_reply("fail"), TerminalReply::Declined("declined at the terminal".into()));
  }

  #[test]
  fn payment_needs_id_and_signature() {
    assert_eq!(
      parse_reply("pay_1 sig_1"),
      TerminalReply::Paid {
        payment_id: "pay_1".into(),
        signature: "sig_1".into()
      }
    );
    assert_eq!(parse_reply("pay_1"), TerminalReply::Closed);
    assert_eq!(parse_reply("  \n"), TerminalReply::Closed);
  }
}
