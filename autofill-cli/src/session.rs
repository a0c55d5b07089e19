//! Interactive form: the terminal stands in for the page.

use std::sync::Arc;

use anyhow::{Context, Result};
use autofill_core::{
    Alert, AutofillBinder, Config, FieldEvent, InMemoryForm, OrderingPolicy,
};
use inquire::{InquireError, Text};

use crate::output;

/// Warnings go straight to stderr, one line each.
#[derive(Debug)]
pub struct TerminalAlert;

impl Alert for TerminalAlert {
    fn warn(&self, message: &str) {
        eprintln!("{message}");
    }
}

pub async fn run(config: &Config, ordering: OrderingPolicy) -> Result<()> {
    let form = Arc::new(InMemoryForm::new());
    let binder = AutofillBinder::from_config(config, form.clone(), Arc::new(TerminalAlert))?
        .with_ordering(ordering);

    println!("{}", output::render_form(form.as_ref(), binder.binding()));

    while let Some(city) = prompt_city()? {
        form.set_value(binder.binding().city(), city);

        // Committing an edited input and leaving it fires both events.
        let pending: Vec<_> = [FieldEvent::Change, FieldEvent::Blur]
            .into_iter()
            .filter_map(|event| binder.handle(event))
            .collect();

        if pending.is_empty() {
            println!("City needs more than 2 characters; nothing looked up.");
        }

        for handle in pending {
            handle.await.context("Lookup task failed")?;
        }

        println!("{}", output::render_form(form.as_ref(), binder.binding()));
    }

    Ok(())
}

/// `None` once the user leaves the form.
fn prompt_city() -> Result<Option<String>> {
    match Text::new("City:").with_help_message("Esc to leave the form").prompt_skippable() {
        Ok(city) => Ok(city),
        Err(InquireError::OperationInterrupted) => Ok(None),
        Err(err) => Err(err).context("Failed to read city"),
    }
}
