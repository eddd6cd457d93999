//! CLI 모듈
//!
//! pdfqa CLI 명령어 정의 및 구현

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::app::App;
use crate::chat::{Conversation, Role};
use crate::config::Settings;
use crate::extractor::FileStatus;
use crate::ingest::{IngestEvent, IngestReport, Ingestor};
use crate::knowledge::chunker_from_settings;
use crate::rag::{RagPipeline, RetrievedChunk};

/// 소스 미리보기 길이
const SOURCE_PREVIEW_CHARS: usize = 300;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "pdfqa")]
#[command(version, about = "PDF 문서 기반 RAG 질의응답", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// PDF 폴더를 청크로 나누어 벡터 DB에 저장
    Ingest {
        /// PDF가 있는 폴더 (기본: DATA_DIR)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// chunks.json 저장 폴더 (기본: CHUNKS_DIR)
        #[arg(short, long)]
        chunks_dir: Option<PathBuf>,

        /// 기존 컬렉션을 비우고 다시 구축
        #[arg(long)]
        rebuild: bool,
    },

    /// 단일 질문
    Ask {
        /// 질문
        question: String,

        /// 검색할 청크 수 (기본: TOP_K)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// 스트리밍 없이 전체 답변을 한 번에 받기
        #[arg(long)]
        no_stream: bool,
    },

    /// 대화형 모드 (/history, /clear, /exit)
    Chat {
        /// 검색할 청크 수 (기본: TOP_K)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::from_env().context("설정 로드 실패")?;

    match cli.command {
        Commands::Ingest {
            data_dir,
            chunks_dir,
            rebuild,
        } => {
            if let Some(dir) = data_dir {
                settings.data_dir = dir;
            }
            if let Some(dir) = chunks_dir {
                settings.chunks_dir = dir;
            }
            cmd_ingest(App::new(settings), rebuild).await
        }
        Commands::Ask {
            question,
            top_k,
            no_stream,
        } => {
            apply_top_k(&mut settings, top_k)?;
            cmd_ask(App::new(settings), &question, no_stream).await
        }
        Commands::Chat { top_k } => {
            apply_top_k(&mut settings, top_k)?;
            cmd_chat(App::new(settings)).await
        }
        Commands::Status => cmd_status(App::new(settings)).await,
    }
}

fn apply_top_k(settings: &mut Settings, top_k: Option<usize>) -> Result<()> {
    if let Some(k) = top_k {
        if k == 0 {
            bail!("--top-k는 1 이상이어야 합니다");
        }
        settings.top_k = k;
    }
    Ok(())
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 수집 명령어 (ingest)
async fn cmd_ingest(app: App, rebuild: bool) -> Result<()> {
    let settings = app.settings();

    println!("{}", "=".repeat(50));
    println!("  PDF Q&A - 문서 수집");
    println!("{}", "=".repeat(50));

    // 임베딩 키는 로드 전에 확인 (배치 도중 실패 방지)
    let embedder = app.embedder().await.context(
        "임베딩 프로바이더 초기화 실패\n\n\
         설정 방법:\n  \
         export GEMINI_API_KEY=your-api-key\n\n\
         API 키 발급: https://aistudio.google.com/app/apikey",
    )?;
    let store = app.vector_store().await.context("벡터 DB 열기 실패")?;
    let ingestor = Ingestor::new(chunker_from_settings(settings), embedder, store);

    println!("\n[*] Step 1/4: PDF 로드 ({})", settings.data_dir.display());
    let report = ingestor
        .run(&settings.data_dir, &settings.chunks_dir, rebuild, |event| {
            print_ingest_event(settings, event)
        })
        .await
        .context("수집 실패")?;

    if report.files.is_empty() {
        println!(
            "[!] PDF 파일이 없습니다. {} 폴더에 PDF 문서를 추가하세요.",
            settings.data_dir.display()
        );
        return Ok(());
    }

    print_ingest_summary(&report);
    Ok(())
}

/// 수집 단계별 진행 출력
fn print_ingest_event(settings: &Settings, event: IngestEvent<'_>) {
    match event {
        IngestEvent::Loaded(loaded) => {
            for file in &loaded.files {
                match &file.status {
                    FileStatus::Loaded { pages } => {
                        println!("    [OK] {} ({} 페이지)", file.file_name, pages)
                    }
                    FileStatus::Failed { reason } => {
                        println!("    [!] {} 실패: {}", file.file_name, reason)
                    }
                }
            }
        }
        IngestEvent::Chunked { pages, chunks } => {
            println!("\n[*] Step 2/4: 청크 분할");
            println!(
                "    {} 페이지 → {} 청크 (크기 {}, 오버랩 {})",
                pages, chunks, settings.chunk_size, settings.chunk_overlap
            );
        }
        IngestEvent::Saved(path) => {
            println!("\n[*] Step 3/4: 청크 저장");
            println!("    {}", path.display());
        }
        IngestEvent::Indexing { chunks, rebuild } => {
            println!("\n[*] Step 4/4: 임베딩 및 벡터 DB 저장 ({} 청크)", chunks);
            if rebuild {
                println!("    (--rebuild: 컬렉션 {} 초기화)", settings.collection);
            }
        }
    }
}

fn print_ingest_summary(report: &IngestReport) {
    println!();
    println!("{}", "=".repeat(50));
    println!(
        "[OK] 완료: 파일 성공 {}, 실패 {}",
        report.loaded_files(),
        report.failed_files()
    );
    println!(
        "     {} 페이지, {} 청크, 벡터 DB 전체 {} 청크",
        report.page_count, report.chunk_count, report.stored_total
    );
    println!("{}", "=".repeat(50));
}

/// 단일 질문 명령어 (ask)
async fn cmd_ask(app: App, question: &str, no_stream: bool) -> Result<()> {
    let pipeline = build_pipeline(&app).await?;

    if no_stream {
        let answer = pipeline
            .answer_text(question, None)
            .await
            .context("답변 생성 실패")?;
        println!("{}", answer.text);
        print_sources(&answer.sources);
        return Ok(());
    }

    let sources = stream_answer(&pipeline, question).await?;
    print_sources(&sources);
    Ok(())
}

/// 대화형 명령어 (chat)
async fn cmd_chat(app: App) -> Result<()> {
    let pipeline = build_pipeline(&app).await?;
    let mut conversation = Conversation::new();

    println!(
        "PDF Q&A ({}) - /history: 기록 보기, /clear: 기록 삭제, /exit: 종료",
        pipeline.model()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\n> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await.context("입력 읽기 실패")? else {
            break;
        };
        let question = line.trim();

        match question {
            "" => continue,
            "/exit" | "/quit" => break,
            "/history" => {
                if conversation.is_empty() {
                    println!("(대화 기록 없음)");
                } else {
                    print!("{}", format_history(&conversation));
                }
                continue;
            }
            "/clear" => {
                conversation.clear();
                println!("[OK] 대화 기록을 삭제했습니다.");
                continue;
            }
            _ => {}
        }

        conversation.push_user(question);

        match pipeline.answer(question, None).await {
            Ok(answer) => {
                let mut stream = answer.stream;
                let mut text = String::new();
                let mut failed = false;

                while let Some(fragment) = stream.next().await {
                    match fragment {
                        Ok(fragment) => {
                            print!("{}", fragment);
                            std::io::stdout().flush().ok();
                            text.push_str(&fragment);
                        }
                        Err(e) => {
                            println!("\n[!] 답변 생성 실패: {}", e);
                            failed = true;
                            break;
                        }
                    }
                }
                println!();

                if !failed {
                    print_sources(&answer.sources);
                    conversation.push_assistant(text, answer.sources);
                }
            }
            Err(e) => println!("[!] 검색 실패: {}", e),
        }
    }

    tracing::debug!("Chat ended after {} messages", conversation.len());
    Ok(())
}

/// 상태 명령어 (status)
async fn cmd_status(app: App) -> Result<()> {
    let settings = app.settings();

    println!("pdfqa v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("[*] LLM: {} ({})", settings.llm_model, settings.llm_base_url);
    println!(
        "[*] 임베딩: {} (차원 {})",
        settings.embedding_model, settings.embedding_dimension
    );
    println!("[*] 벡터 DB: {}", settings.vectordb_dir.display());
    println!("[*] 컬렉션: {}", settings.collection);

    if settings.llm_api_key.is_some() {
        println!("[OK] GROQ_API_KEY: 설정됨");
    } else {
        println!("[!] GROQ_API_KEY: 미설정");
    }
    if settings.embedding_api_key.is_some() {
        println!("[OK] GEMINI_API_KEY: 설정됨");
    } else {
        println!("[!] GEMINI_API_KEY: 미설정");
    }

    // 저장소를 열 수 없으면 0으로 표시
    let count = match app.vector_store().await {
        Ok(store) => store.count().await.unwrap_or_else(|e| {
            tracing::debug!("벡터 카운트 실패: {}", e);
            0
        }),
        Err(e) => {
            tracing::debug!("벡터 DB 열기 실패: {}", e);
            0
        }
    };
    println!("[OK] 인덱스된 청크: {} 건", count);

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

async fn build_pipeline(app: &App) -> Result<RagPipeline> {
    if app.settings().llm_api_key.is_none() {
        bail!(
            "GROQ_API_KEY가 설정되지 않았습니다.\n\
             설정: export GROQ_API_KEY=your-key"
        );
    }
    app.pipeline().await.context("파이프라인 초기화 실패")
}

/// 답변을 스트리밍 출력하고 근거 청크 반환
async fn stream_answer(pipeline: &RagPipeline, question: &str) -> Result<Vec<RetrievedChunk>> {
    let answer = pipeline
        .answer(question, None)
        .await
        .context("검색 실패")?;

    let mut stream = answer.stream;
    while let Some(fragment) = stream.next().await {
        let fragment = fragment.context("답변 생성 실패")?;
        print!("{}", fragment);
        std::io::stdout().flush().ok();
    }
    println!();

    Ok(answer.sources)
}

fn print_sources(sources: &[RetrievedChunk]) {
    if sources.is_empty() {
        return;
    }

    println!("\n[*] 출처 ({} 건)", sources.len());
    for (i, source) in sources.iter().enumerate() {
        println!("{}", format_source_header(i + 1, source));
        println!("   {}", truncate_text(&source.content, SOURCE_PREVIEW_CHARS));
    }
}

/// `Chunk i | Source | Page | Score` 한 줄
fn format_source_header(index: usize, source: &RetrievedChunk) -> String {
    format!(
        "Chunk {} | Source: {} | Page: {} | Score: {:.4}",
        index, source.metadata.source, source.metadata.page, source.score
    )
}

/// 대화 기록을 역할별로, 어시스턴트 답변은 출처와 함께
fn format_history(conversation: &Conversation) -> String {
    let mut out = String::new();
    for message in conversation.messages() {
        let label = match message.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
        };
        out.push_str(&format!(
            "[{}] {}: {}\n",
            message.created_at.format("%H:%M:%S"),
            label,
            message.content
        ));
        for (i, source) in message.sources.iter().flatten().enumerate() {
            out.push_str(&format!("    {}\n", format_source_header(i + 1, source)));
        }
    }
    out
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::ChunkMetadata;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("hello\nworld", 20), "hello world");
    }

    #[test]
    fn test_truncate_unicode() {
        let korean = "하늘은 파랗다";
        assert_eq!(truncate_text(korean, 3), "하늘은...");
    }

    #[test]
    fn test_source_header() {
        let source = RetrievedChunk {
            content: "The sky is blue.".to_string(),
            metadata: ChunkMetadata {
                source: "sky.pdf".to_string(),
                page: 3,
                chunk_id: 7,
            },
            score: 0.5,
        };
        assert_eq!(
            format_source_header(1, &source),
            "Chunk 1 | Source: sky.pdf | Page: 3 | Score: 0.5000"
        );
    }

    #[test]
    fn test_history_lists_messages_with_sources() {
        let source = RetrievedChunk {
            content: "The sky is blue.".to_string(),
            metadata: ChunkMetadata {
                source: "sky.pdf".to_string(),
                page: 1,
                chunk_id: 0,
            },
            score: 0.6584,
        };

        let mut conversation = Conversation::new();
        conversation.push_user("What color is the sky?");
        conversation.push_assistant("Blue.", vec![source]);
        conversation.push_user("And grass?");
        conversation.push_assistant(crate::rag::REFUSAL_MESSAGE, vec![]);

        let history = format_history(&conversation);
        let lines: Vec<&str> = history.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].ends_with("You: What color is the sky?"));
        assert!(lines[1].ends_with("Assistant: Blue."));
        assert_eq!(
            lines[2],
            "    Chunk 1 | Source: sky.pdf | Page: 1 | Score: 0.6584"
        );
        assert!(lines[3].ends_with("You: And grass?"));
        assert!(lines[4].contains("Assistant: "));

        conversation.clear();
        assert!(format_history(&conversation).is_empty());
    }

    #[test]
    fn test_apply_top_k() {
        let mut settings = Settings::default();
        apply_top_k(&mut settings, Some(8)).unwrap();
        assert_eq!(settings.top_k, 8);
        assert!(apply_top_k(&mut settings, Some(0)).is_err());
        apply_top_k(&mut settings, None).unwrap();
        assert_eq!(settings.top_k, 8);
    }

    #[test]
    fn test_cli_parses_commands() {
        let cli =
            Cli::try_parse_from(["pdfqa", "ask", "What color is the sky?", "-k", "3"]).unwrap();
        match cli.command {
            Commands::Ask {
                question,
                top_k,
                no_stream,
            } => {
                assert_eq!(question, "What color is the sky?");
                assert_eq!(top_k, Some(3));
                assert!(!no_stream);
            }
            _ => panic!("expected ask"),
        }

        let cli = Cli::try_parse_from(["pdfqa", "ingest", "--rebuild"]).unwrap();
        assert!(matches!(cli.command, Commands::Ingest { rebuild: true, .. }));
    }
}
