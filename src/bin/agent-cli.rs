use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use agent_server::cli::ChatSession;
use agent_server::conversation::ConversationSummary;
use agent_server::events::{Event, EventSource, EventStream, EventSubscriber};
use agent_server::realtime::ClientMessage;

#[derive(Parser)]
#[command(name = "agent-cli")]
#[command(about = "Terminal chat client for the agent server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:3000")]
    url: String,

    /// Join an existing conversation instead of starting one
    #[arg(short, long)]
    conversation: Option<String>,

    /// Title for a newly created conversation
    #[arg(short, long)]
    title: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdin reads block a runtime thread; don't wait on them at exit.
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(cli));
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let base = cli.url.trim_end_matches('/').to_string();
    let conversation_id = match cli.conversation {
        Some(id) => id,
        None => create_conversation(&base, cli.title).await?,
    };

    let ws_url = format!(
        "{}/ws?conversation_id={}",
        base.replacen("http", "ws", 1),
        conversation_id
    );
    let (socket, _) = tokio_tungstenite::connect_async(ws_url.as_str()).await?;
    let (mut sink, mut source) = socket.split();

    let stream = Arc::new(EventStream::default());

    // Local user messages go out over the socket.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    stream.subscribe(EventSubscriber::Cli, "forward", move |event| {
        if event.source == EventSource::User {
            if let Some(content) = event.content() {
                let _ = tx.send(content.to_string());
            }
        }
    });
    let writer = tokio::spawn(async move {
        while let Some(content) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&ClientMessage::Message { content }) else {
                continue;
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Remote events land in the local stream; user events are already local.
    let local = Arc::clone(&stream);
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = source.next().await {
            match msg {
                Message::Text(text) => {
                    if let Ok(event) = serde_json::from_str::<Event>(text.as_str()) {
                        if event.source != EventSource::User {
                            local.add_event(event.kind, event.source);
                        }
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    println!("Conversation {conversation_id}. Type /exit to quit.");
    let session = ChatSession::new(stream, std::io::stdout());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());

    tokio::select! {
        result = session.run(stdin) => result?,
        _ = reader => eprintln!("Connection closed by server"),
    }

    writer.abort();
    Ok(())
}

async fn create_conversation(
    base: &str,
    title: Option<String>,
) -> Result<String, Box<dyn std::error::Error>> {
    let res = reqwest::Client::new()
        .post(format!("{base}/api/conversations"))
        .json(&json!({ "title": title }))
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        return Err(format!("Server returned status {status}: {text}").into());
    }

    let summary: ConversationSummary = res.json().await?;
    Ok(summary.id)
}
