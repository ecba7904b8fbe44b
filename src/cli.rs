use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;

use tasks_client::config::ConnectionArgs;
use tasks_client::models::{NewTask, TaskStatus};
use tasks_client::{TaskBoard, TasksApi};

/// Command-line client for the task manager API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List tasks (first page unless --all)
    List {
        /// Follow pagination to the last page
        #[arg(long)]
        all: bool,
    },

    /// Create a task
    Create {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Due date as YYYY-MM-DD
        #[arg(long)]
        due_date: NaiveDate,

        #[arg(long, default_value = "pending")]
        status: TaskStatus,

        /// Id of the assignee
        #[arg(long)]
        assigned_to: u64,
    },

    /// Update fields of an existing task
    Update {
        id: u64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        due_date: Option<NaiveDate>,

        #[arg(long)]
        status: Option<TaskStatus>,

        #[arg(long)]
        assigned_to: Option<u64>,
    },

    /// Delete a task
    Delete { id: u64 },

    /// List users tasks can be assigned to
    Users,
}

pub async fn run(command: Command, api: TasksApi) -> Result<()> {
    match command {
        Command::List { all } => {
            let mut board = TaskBoard::new(api);
            board.load().await?;
            if all {
                while board.load_more().await? {}
            }

            tracing::info!(
                loaded = board.tasks().len(),
                total = board.total(),
                "Tasks loaded"
            );
            print_json(board.tasks())
        }

        Command::Create {
            title,
            description,
            due_date,
            status,
            assigned_to,
        } => {
            let new_task = NewTask::new(title, due_date, assigned_to)
                .with_description(description)
                .with_status(status);

            let task = api.create_task(&new_task).await?;
            print_json(&task)
        }

        Command::Update {
            id,
            title,
            description,
            due_date,
            status,
            assigned_to,
        } => {
            let mut task = api
                .get_all_tasks()
                .await?
                .into_iter()
                .find(|t| t.id == id)
                .with_context(|| format!("Task {} not found", id))?;

            if let Some(title) = title {
                task.title = title;
            }
            if let Some(description) = description {
                task.description = description;
            }
            if let Some(due_date) = due_date {
                task.due_date = due_date;
            }
            if let Some(status) = status {
                task.status = status;
            }
            if let Some(assigned_to) = assigned_to {
                task.assigned_to = assigned_to;
            }

            api.update_task(&task).await?;
            print_json(&task)
        }

        Command::Delete { id } => {
            api.delete_task(id).await?;
            tracing::info!("Task {} deleted", id);
            Ok(())
        }

        Command::Users => {
            let users = api.get_users().await?;
            print_json(&users)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
