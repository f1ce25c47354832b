use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Datelike, Utc};
use clap::Parser;
use client_core::{
    listing::{SortColumn, SortDirection, SortSpec},
    response::{ResponseChoice, ResponseWorkflow, SubmitOutcome},
    FileProbe, HttpRequestGateway, ListingController, RequestGateway, ScreenNavigator,
};
use client_core::listing::EmptyReason;
use shared::domain::Tab;
use shared::protocol::FileCandidate;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, normalize_server_url};

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    server_url: Option<String>,
}

#[derive(Debug)]
enum NavCommand {
    OpenResponse(String),
    ReturnToListing,
}

struct ConsoleNavigator {
    commands: mpsc::UnboundedSender<NavCommand>,
}

impl ScreenNavigator for ConsoleNavigator {
    fn open_response_screen(&self, tracking_number: &str) {
        let _ = self
            .commands
            .send(NavCommand::OpenResponse(tracking_number.to_string()));
    }

    fn return_to_previous(&self) {
        let _ = self.commands.send(NavCommand::ReturnToListing);
    }
}

struct FsFileProbe;

impl FileProbe for FsFileProbe {
    fn can_read(&self, file: &FileCandidate) -> bool {
        std::fs::read(&file.path).is_ok()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    let server_url = normalize_server_url(&settings.server_url)?;

    let gateway: Arc<dyn RequestGateway> = Arc::new(HttpRequestGateway::new(server_url));
    let (nav_tx, mut nav_rx) = mpsc::unbounded_channel();
    let navigator: Arc<dyn ScreenNavigator> = Arc::new(ConsoleNavigator { commands: nav_tx });
    let probe: Arc<dyn FileProbe> = Arc::new(FsFileProbe);

    let mut listing = ListingController::new(Arc::clone(&gateway), Arc::clone(&navigator));
    if let Err(err) = listing.refresh().await {
        eprintln!("Error al cargar las solicitudes: {err}");
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        render_listing(&listing);
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("reading command")?;
        if !handle_listing_command(line.trim(), &mut listing).await? {
            break;
        }

        while let Ok(command) = nav_rx.try_recv() {
            if let NavCommand::OpenResponse(tracking_number) = command {
                run_response_screen(
                    Arc::clone(&gateway),
                    Arc::clone(&navigator),
                    Arc::clone(&probe),
                    &mut nav_rx,
                    &mut lines,
                    &tracking_number,
                )
                .await?;
                // Coming back re-enters the listing, which reloads itself.
                if let Err(err) = listing.refresh().await {
                    eprintln!("Error al cargar las solicitudes: {err}");
                }
            }
        }
    }

    Ok(())
}

async fn handle_listing_command(line: &str, listing: &mut ListingController) -> Result<bool> {
    let (command, rest) = match line.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "salir" => return Ok(false),
        "pendientes" => listing.select_tab(Tab::Pending),
        "completadas" => listing.select_tab(Tab::Completed),
        "buscar" => listing.set_search_term(rest),
        "orden" => match rest {
            "numero" => listing.toggle_sort(SortColumn::TrackingNumber),
            "solicitante" => listing.toggle_sort(SortColumn::Applicant),
            "fecha" => listing.toggle_sort(SortColumn::CreatedAt),
            "estado" => listing.toggle_sort(SortColumn::State),
            _ => println!("Columnas: numero, solicitante, fecha, estado"),
        },
        "pagina" => match rest.parse::<usize>() {
            Ok(page) => listing.set_page(page),
            Err(_) => println!("Uso: pagina N"),
        },
        "abrir" => match rest.parse::<usize>() {
            Ok(row_number) if row_number >= 1 => {
                let id = listing
                    .visible_page()
                    .rows
                    .get(row_number - 1)
                    .map(|row| row.id);
                match id {
                    Some(id) => {
                        if !listing.open_response(id) {
                            println!("La solicitud no admite respuesta en su estado actual.");
                        }
                    }
                    None => println!("No hay una fila {row_number} en esta página."),
                }
            }
            _ => println!("Uso: abrir N (número de fila)"),
        },
        "recargar" => {
            if let Err(err) = listing.refresh().await {
                eprintln!("Error al cargar las solicitudes: {err}");
            }
        }
        "" => {}
        _ => println!("Comando desconocido: {command}"),
    }

    Ok(true)
}

async fn run_response_screen(
    gateway: Arc<dyn RequestGateway>,
    navigator: Arc<dyn ScreenNavigator>,
    probe: Arc<dyn FileProbe>,
    nav_rx: &mut mpsc::UnboundedReceiver<NavCommand>,
    lines: &mut io::Lines<io::StdinLock<'_>>,
    tracking_number: &str,
) -> Result<()> {
    let mut workflow = match ResponseWorkflow::open(
        gateway,
        Arc::clone(&navigator),
        probe,
        tracking_number,
    )
    .await
    {
        Ok(workflow) => workflow,
        Err(err) => {
            eprintln!("Error: {err}");
            return Ok(());
        }
    };

    loop {
        render_response(&workflow);
        print!("respuesta> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            return Ok(());
        };
        let line = line.context("reading command")?;
        let line = line.trim();
        let (command, rest) = match line.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "correcciones" => workflow.set_response_choice(Some(ResponseChoice::Correction)),
            "certificacion" => workflow.set_response_choice(Some(ResponseChoice::Certification)),
            "ninguna" => workflow.set_response_choice(None),
            "comentario" => workflow.set_comment(rest),
            "archivos" => match collect_candidates(rest) {
                Ok(batch) => workflow.select_files(batch),
                Err(err) => eprintln!("{err}"),
            },
            "quitar" => match rest.parse::<usize>() {
                Ok(index) if index >= 1 => workflow.remove_file(index - 1),
                _ => println!("Uso: quitar N"),
            },
            "enviar" => match workflow.submit().await {
                Ok(SubmitOutcome::CorrectionReturned) => {
                    println!("Solicitud devuelta para correcciones");
                }
                Ok(SubmitOutcome::CertificationSent) => {
                    println!("Certificación enviada correctamente");
                }
                Err(err) => eprintln!("Error al enviar la respuesta: {err}"),
            },
            "cancelar" => navigator.return_to_previous(),
            "" => {}
            _ => println!("Comando desconocido: {command}"),
        }

        while let Ok(command) = nav_rx.try_recv() {
            if matches!(command, NavCommand::ReturnToListing) {
                return Ok(());
            }
        }
    }
}

fn collect_candidates(rest: &str) -> Result<Vec<FileCandidate>> {
    if rest.is_empty() {
        return Err(anyhow!("Uso: archivos RUTA [RUTA...]"));
    }
    rest.split_whitespace().map(candidate_from_path).collect()
}

fn candidate_from_path(raw: &str) -> Result<FileCandidate> {
    let path = PathBuf::from(raw);
    let metadata =
        std::fs::metadata(&path).map_err(|err| anyhow!("No se pudo leer {raw}: {err}"))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("Ruta sin nombre de archivo: {raw}"))?;
    Ok(FileCandidate {
        name,
        size_bytes: metadata.len(),
        path,
    })
}

fn render_listing(listing: &ListingController) {
    let view = listing.visible_page();

    println!();
    println!("=== Gestión de solicitudes de exención de pasantías ===");
    let (pending_mark, completed_mark) = match listing.tab() {
        Tab::Pending => ("[Pendientes]", " Completadas "),
        Tab::Completed => (" Pendientes ", "[Completadas]"),
    };
    println!("{pending_mark}{completed_mark}");
    if !listing.search_term().is_empty() {
        println!("Búsqueda: \"{}\"", listing.search_term());
    }
    if listing.is_loading() {
        println!("Cargando solicitudes...");
        return;
    }

    println!(
        "{:<4} {:<18} {:<24} {:<24} {:<28} Acción",
        "#",
        header("Número", listing.sort(), SortColumn::TrackingNumber),
        header("Solicitante", listing.sort(), SortColumn::Applicant),
        header("Fecha", listing.sort(), SortColumn::CreatedAt),
        header("Estado", listing.sort(), SortColumn::State),
    );

    match view.empty {
        Some(EmptyReason::NoSearchMatches) => {
            println!("No se encontraron resultados para tu búsqueda");
        }
        Some(EmptyReason::NoRequests) => println!("No hay solicitudes"),
        None => {
            for (index, row) in view.rows.iter().enumerate() {
                let action = if row.state.accepts_response() {
                    "responder"
                } else {
                    "—"
                };
                println!(
                    "{:<4} {:<18} {:<24} {:<24} {:<28} {action}",
                    index + 1,
                    row.tracking_number,
                    row.applicant_name,
                    format_creation_date(row.created_at),
                    row.state.label(),
                );
            }
        }
    }

    if let Some((start, end)) = view.shown_range() {
        println!(
            "Mostrando {start} - {end} de {} solicitudes (página {}/{})",
            view.total_matches, view.page, view.total_pages
        );
    }
    println!(
        "Comandos: pendientes | completadas | buscar [texto] | orden COLUMNA | pagina N | abrir N | recargar | salir"
    );
}

fn header(title: &str, sort: Option<SortSpec>, column: SortColumn) -> String {
    let marker = match sort {
        Some(spec) if spec.column == column => match spec.direction {
            SortDirection::Ascending => " ↑",
            SortDirection::Descending => " ↓",
        },
        _ => "",
    };
    format!("{title}{marker}")
}

fn render_response(workflow: &ResponseWorkflow) {
    let request = workflow.request();

    println!();
    println!("=== Respuesta a solicitud {} ===", request.tracking_number);
    println!("Cédula: {}", request.national_id);
    println!("Nombre: {}", request.applicant_name);
    if request.stored_files.is_empty() {
        println!("No hay archivos cargados.");
    } else {
        println!("Documentos de la solicitud:");
        for file in &request.stored_files {
            println!("  - {}", file.original_name);
        }
    }

    let choice = match workflow.choice() {
        None => "sin seleccionar",
        Some(ResponseChoice::Correction) => "realizar correcciones",
        Some(ResponseChoice::Certification) => "enviar certificación",
    };
    println!("Respuesta: {choice}");

    if workflow.choice() == Some(ResponseChoice::Correction) {
        println!(
            "Comentario ({}/250 caracteres): {}",
            workflow.comment().chars().count(),
            workflow.comment()
        );
    }
    if workflow.choice() == Some(ResponseChoice::Certification) {
        for (index, file) in workflow.selected_files().iter().enumerate() {
            println!(
                "  {}. {} ({:.2} KB)",
                index + 1,
                file.name,
                file.size_bytes as f64 / 1024.0
            );
        }
    }
    for message in workflow.field_errors().values() {
        println!("  ! {message}");
    }

    if workflow.is_sending() {
        println!("Enviando...");
    } else if workflow.is_ready() {
        println!("Listo para enviar.");
    } else {
        println!("Complete los campos obligatorios.");
    }
    println!(
        "Comandos: correcciones | certificacion | ninguna | comentario TEXTO | archivos RUTA... | quitar N | enviar | cancelar"
    );
}

/// Long-form date the way the rest of the tooling prints it for DO users.
fn format_creation_date(date: DateTime<Utc>) -> String {
    let month = match date.month() {
        1 => "enero",
        2 => "febrero",
        3 => "marzo",
        4 => "abril",
        5 => "mayo",
        6 => "junio",
        7 => "julio",
        8 => "agosto",
        9 => "septiembre",
        10 => "octubre",
        11 => "noviembre",
        12 => "diciembre",
        _ => "—",
    };
    format!("{} de {} de {}", date.day(), month, date.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn formats_dates_in_spanish_long_form() {
        let date: DateTime<Utc> = "2026-03-02T14:30:00Z".parse().expect("timestamp");
        assert_eq!(format_creation_date(date), "2 de marzo de 2026");
    }

    #[test]
    fn header_marks_only_the_active_sort_column() {
        let sort = Some(SortSpec {
            column: SortColumn::Applicant,
            direction: SortDirection::Descending,
        });
        assert_eq!(header("Solicitante", sort, SortColumn::Applicant), "Solicitante ↓");
        assert_eq!(header("Número", sort, SortColumn::TrackingNumber), "Número");
        assert_eq!(header("Número", None, SortColumn::TrackingNumber), "Número");
    }

    #[test]
    fn candidates_carry_name_and_size_from_the_filesystem() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let temp_root = std::env::temp_dir().join(format!("gestor_console_test_{suffix}"));
        fs::create_dir_all(&temp_root).expect("temp root");
        let path = temp_root.join("cedula.pdf");
        fs::write(&path, vec![0u8; 512]).expect("write");

        let candidate = candidate_from_path(&path.to_string_lossy()).expect("candidate");
        assert_eq!(candidate.name, "cedula.pdf");
        assert_eq!(candidate.size_bytes, 512);

        assert!(candidate_from_path("/definitely/not/there.pdf").is_err());

        fs::remove_dir_all(temp_root).expect("cleanup");
    }
}
