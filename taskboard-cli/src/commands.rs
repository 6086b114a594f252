use crate::cli::{BoardCommands, CardCommands, Cli, Commands, ListCommands};
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use taskboard::{
    activity::ListActivity,
    board::{AddMember, CreateBoard, GetBoard, ListBoards},
    card::{AddCard, DeleteCard, GetCard, UpdateCard},
    list::{AddList, DeleteList, RenameList},
    ActivityLog, AuditSink, BoardContext, BoardId, BoardOperationProcessor, BoardSession, CardId,
    Execute, ListId, SessionOptions, TaskboardConfig, UserId,
};

/// Actor used when neither `--actor` nor the configuration names one
const DEFAULT_ACTOR: &str = "local";

/// Run one command and return what to print
pub async fn run(cli: &Cli, config: &TaskboardConfig) -> Result<Value> {
    let runner = Runner::new(cli, config);
    match &cli.command {
        Commands::Board { command } => runner.board(command).await,
        Commands::List { command } => runner.list(command).await,
        Commands::Card { command } => runner.card(command).await,
        Commands::Activity { board, limit } => {
            let mut op = ListActivity::new(board.as_str());
            if let Some(limit) = limit {
                op = op.with_limit(*limit);
            }
            runner.process(&op).await
        }
        Commands::Respace { board } => {
            let changed = runner
                .with_session(board, |session| Box::pin(session.respace_board()))
                .await?;
            Ok(json!({ "board": board, "respaced": changed }))
        }
    }
}

struct Runner {
    ctx: BoardContext,
    actor: UserId,
    options: SessionOptions,
}

impl Runner {
    fn new(cli: &Cli, config: &TaskboardConfig) -> Self {
        let data_dir: PathBuf = cli
            .data_dir
            .clone()
            .unwrap_or_else(|| config.data_dir.clone());
        let actor = cli
            .actor
            .clone()
            .or_else(|| config.actor.clone())
            .unwrap_or_else(|| DEFAULT_ACTOR.to_string());
        tracing::debug!(data_dir = %data_dir.display(), actor = %actor, "resolved cli context");

        Self {
            ctx: BoardContext::new(data_dir),
            actor: UserId::from_string(actor),
            options: SessionOptions::from(&config.drag),
        }
    }

    async fn process<O>(&self, op: &O) -> Result<Value>
    where
        O: Execute<BoardContext, taskboard::BoardError>,
    {
        let processor = BoardOperationProcessor::new(self.actor.clone());
        processor
            .process(op, &self.ctx)
            .await
            .with_context(|| format!("{} failed", op.op_string()))
    }

    async fn board(&self, command: &BoardCommands) -> Result<Value> {
        match command {
            BoardCommands::Create { title } => {
                self.process(&CreateBoard::new(title.as_str(), self.actor.clone()))
                    .await
            }
            BoardCommands::List => self.process(&ListBoards::for_user(self.actor.clone())).await,
            BoardCommands::Show { board } => self.process(&GetBoard::new(board.as_str())).await,
            BoardCommands::AddMember { board, user } => {
                self.process(&AddMember::new(board.as_str(), user.as_str()))
                    .await
            }
        }
    }

    async fn list(&self, command: &ListCommands) -> Result<Value> {
        match command {
            ListCommands::Add { board, title } => {
                self.process(&AddList::new(board.as_str(), title.as_str()))
                    .await
            }
            ListCommands::Rename { list, title } => {
                self.process(&RenameList::new(list.as_str(), title.as_str()))
                    .await
            }
            ListCommands::Delete { list } => self.process(&DeleteList::new(list.as_str())).await,
            ListCommands::Move { board, list, index } => {
                let list_id = ListId::from_string(list.as_str());
                let index = *index;
                let command = self
                    .with_session(board, |session| {
                        Box::pin(async move { session.move_list(&list_id, index).await })
                    })
                    .await?;
                Ok(json!({ "moved": command.is_some(), "command": command }))
            }
        }
    }

    async fn card(&self, command: &CardCommands) -> Result<Value> {
        match command {
            CardCommands::Add {
                list,
                title,
                description,
            } => {
                let mut op =
                    AddCard::new(list.as_str(), title.as_str()).with_creator(self.actor.clone());
                if let Some(description) = description {
                    op = op.with_description(description.as_str());
                }
                self.process(&op).await
            }
            CardCommands::Show { card } => self.process(&GetCard::new(card.as_str())).await,
            CardCommands::Update {
                card,
                title,
                description,
                labels,
                clear_labels,
                due,
                clear_due,
            } => {
                let mut op = UpdateCard::new(card.as_str());
                op.title = title.clone();
                op.description = description.clone();
                op.clear_labels = *clear_labels;
                op.toggle_labels = labels.clone();
                op.due_date = *due;
                op.clear_due_date = *clear_due;
                self.process(&op).await
            }
            CardCommands::Move {
                board,
                card,
                list,
                index,
            } => {
                let card_id = CardId::from_string(card.as_str());
                let list_id = ListId::from_string(list.as_str());
                let index = *index;
                let command = self
                    .with_session(board, |session| {
                        Box::pin(async move { session.move_card(&card_id, &list_id, index).await })
                    })
                    .await?;
                Ok(json!({ "moved": command.is_some(), "command": command }))
            }
            CardCommands::Delete { card } => self.process(&DeleteCard::new(card.as_str())).await,
        }
    }

    /// Open a session on `board`, run `f` on it, then flush its activity
    async fn with_session<T, F>(&self, board: &str, f: F) -> Result<T>
    where
        F: for<'a> FnOnce(
            &'a mut BoardSession<BoardContext>,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = taskboard::Result<T>> + 'a>,
        >,
    {
        self.ctx.ensure_directories().await?;
        let (log, writer) = ActivityLog::spawn(self.ctx.clone());
        let audit: Arc<dyn AuditSink> = Arc::new(log);

        let board_id = BoardId::from_string(board);
        let mut session = BoardSession::open(
            Arc::new(self.ctx.clone()),
            &board_id,
            self.actor.clone(),
            audit,
            self.options.clone(),
        )
        .await
        .with_context(|| format!("failed to open board {board}"))?;

        let result = f(&mut session).await;
        drop(session);
        writer.await.context("activity writer stopped unexpectedly")?;
        Ok(result?)
    }
}
