//! History maintenance command handlers

use crate::cli::HistoryCommand;
use crate::error::Result;
use crate::history::{ConversationRepository, ConversationSummary, Sender};
use crate::store::BlobStore;
use colored::Colorize;
use prettytable::{format, Table};

/// Handle history commands
pub fn handle_history<S: BlobStore>(
    repository: &mut ConversationRepository<S>,
    command: HistoryCommand,
) -> Result<()> {
    match command {
        HistoryCommand::List => {
            let summaries = repository.summaries();
            if summaries.is_empty() {
                println!("{}", "No conversation history found.".yellow());
                return Ok(());
            }
            print_summary_table(&summaries);
            println!(
                "Use {} to inspect a conversation.",
                "carelog history show <ID>".cyan()
            );
            println!();
        }
        HistoryCommand::Show { id } => match repository.find_by_prefix(&id) {
            Some(conversation) => {
                println!();
                println!("{}", conversation.title.bold());
                println!("{}", conversation.id.cyan());
                println!(
                    "Created {}  Updated {}",
                    conversation.created_at.format("%Y-%m-%d %H:%M"),
                    conversation.updated_at.format("%Y-%m-%d %H:%M")
                );
                if !conversation.tags.is_empty() {
                    println!("Tags: {}", conversation.tags.join(", ").green());
                }
                if conversation.total_messages > conversation.messages.len() {
                    println!(
                        "{}",
                        format!(
                            "Showing the most recent {} of {} messages.",
                            conversation.messages.len(),
                            conversation.total_messages
                        )
                        .yellow()
                    );
                }
                println!();
                for message in &conversation.messages {
                    let label = match message.sender {
                        Sender::User => "you".blue().bold(),
                        Sender::Ai => "assistant".magenta().bold(),
                    };
                    println!("{}: {}", label, message.text);
                }
                println!();
            }
            None => println!("{}", format!("No conversation matching '{}'", id).yellow()),
        },
        HistoryCommand::Search { query } => {
            let results = repository.search(&query);
            if results.is_empty() {
                println!("{}", format!("No conversations match '{}'.", query).yellow());
                return Ok(());
            }
            print_summary_table(&results);
        }
        HistoryCommand::Delete { id } => {
            let resolved = repository.find_by_prefix(&id).map(|c| c.id);
            match resolved {
                Some(full_id) => {
                    repository.delete(&full_id)?;
                    println!("{}", format!("Deleted conversation {}", full_id).green());
                }
                None => {
                    println!("{}", format!("No conversation matching '{}'", id).yellow())
                }
            }
        }
        HistoryCommand::Clear => {
            let count = repository.len();
            repository.clear_all()?;
            println!(
                "{}",
                format!("Cleared {} conversation(s) from the store.", count).green()
            );
        }
    }

    Ok(())
}

fn print_summary_table(summaries: &[ConversationSummary]) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Title".bold(),
        "Tags".bold(),
        "Messages".bold(),
        "Last Updated".bold()
    ]);

    for summary in summaries {
        let id_short: String = summary.id.chars().take(8).collect();
        let title = if summary.title.chars().count() > 40 {
            let head: String = summary.title.chars().take(37).collect();
            format!("{}...", head)
        } else {
            summary.title.clone()
        };
        let tags = if summary.tags.is_empty() {
            "-".to_string()
        } else {
            summary.tags.join(", ")
        };
        let updated = summary.updated_at.format("%Y-%m-%d %H:%M").to_string();

        table.add_row(prettytable::row![
            id_short.cyan(),
            title,
            tags,
            summary.message_count,
            updated
        ]);
    }

    println!("\nConversation History:");
    table.printstd();
    println!();
}
