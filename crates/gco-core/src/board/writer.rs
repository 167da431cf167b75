//! Deterministic board generation.

use std::borrow::Cow;

use super::labels;
use super::parser::{ESCAPE, needs_escape};
use super::{Board, BoardMetadata, RawBlock};
use crate::model::{Status, Task};

const TRAILER: &str = "
## Leyenda de Estados

- `[STATUS:pending]` - Tarea creada, sin empezar, sin asignar o asignada pero no iniciada
- `[STATUS:in-progress]` - Agente trabajando activamente
- `[STATUS:blocked]` - Bloqueada por dependencias o esperando a otro agente
- `[STATUS:completed]` - Terminada, revisada y mergeada a develop
- `[STATUS:review]` - Terminada, esperando aprobación del humano

## Leyenda de Asignación

- `[ASSIGNED:]` - Sin asignar (cualquier agente puede tomarla)
- `[ASSIGNED:@vscode]` - Asignada a agente VS Code
- `[ASSIGNED:@copilot]` - Asignada a agente Copilot CLI
- `[ASSIGNED:@claude]` - Asignada a agente Claude CLI
- `[ASSIGNED:@cursor]` - Asignada a agente Cursor Agent
- `[ASSIGNED:@windsurf]` - Asignada a agente Windsurf Agent
- `[ASSIGNED:@aider]` - Asignada a agente Aider CLI
- `[ASSIGNED:@codex]` - Asignada a agente OpenAI Codex CLI
- `[ASSIGNED:@nombre]` - Otros agents (extensible)

## Reglas para Agents

> ⚠️ **NO edites este archivo manualmente.** Usa los comandos `gco task` para gestionar tareas.

1. **Crear tarea:** `gco task create --title \"Mi tarea\"`
2. **Tomar tarea:** El orquestador asigna con `gco assign TASK-XXX agente`
3. **Iniciar trabajo:** `gco task status TASK-XXX in-progress`
4. **Completar tarea:** `gco task status TASK-XXX review`
5. **Bloquear tarea:** `gco task status TASK-XXX blocked`
6. **Nunca borrar tareas:** Solo cambiar status
7. **Ver estado:** `gco status` o `gco task list`

## Ejemplo de Tarea

El formato de cada tarea en este archivo es:

- Encabezado: `## TASK-NNN [STATUS:estado] [ASSIGNED:@agente]`
- Campos: **Título**, **Descripción**, **Criterios de aceptación** (checkboxes), **Dependencias**, **Notas técnicas**, **Completada**
- Separador: `---` al final de cada tarea

Para crear tareas usa: `gco task create --title \"Mi tarea\"`
Para cambiar estado usa: `gco task status TASK-NNN review`
";

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() { placeholder } else { value }
}

/// Single-line fields cannot carry a line break.
fn one_line(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r']) {
        Cow::Owned(value.replace("\r\n", " ").replace(['\n', '\r'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

/// Push `value` line by line, escaping lines from index `skip` on.
fn push_multiline(out: &mut String, value: &str, skip: usize) {
    for (i, line) in value.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if i >= skip && needs_escape(line) {
            out.push(ESCAPE);
        }
        out.push_str(line);
    }
    out.push('\n');
}

fn count(tasks: &[Task], pred: impl Fn(Status) -> bool) -> usize {
    tasks.iter().filter(|t| pred(t.status)).count()
}

fn push_task(out: &mut String, task: &Task) {
    out.push_str(&format!(
        "\n## {} [STATUS:{}] [ASSIGNED:{}]\n",
        task.id, task.status, task.assigned
    ));
    out.push_str(&format!("{} {}\n", labels::TITLE, one_line(&task.title)));
    out.push_str(labels::DESCRIPTION);
    out.push(' ');
    push_multiline(out, &task.description, 1);
    out.push_str(labels::CRITERIA);
    out.push('\n');
    for criterion in &task.criteria {
        let mark = if criterion.done { 'x' } else { ' ' };
        out.push_str(&format!("- [{mark}] {}\n", one_line(&criterion.text)));
    }
    out.push_str(&format!(
        "{} {}\n",
        labels::DEPENDENCIES,
        or_placeholder(&one_line(&task.dependencies), labels::NO_DEPENDENCIES)
    ));
    out.push_str(labels::NOTES);
    out.push('\n');
    if task.notes.is_empty() {
        out.push_str(labels::EMPTY);
        out.push('\n');
    } else {
        push_multiline(out, &task.notes, 0);
    }
    if let Some(issue) = task.github_issue {
        out.push_str(&format!("{} #{issue}\n", labels::GITHUB_ISSUE));
    }
    out.push_str(&format!(
        "{} {}\n",
        labels::COMPLETED,
        or_placeholder(&one_line(&task.completed), labels::EMPTY)
    ));
    if task.status == Status::Blocked {
        out.push_str(&format!(
            "{} {}\n",
            labels::BLOCKED_SINCE,
            one_line(&task.blocked_since)
        ));
        out.push_str(&format!(
            "{} {}\n",
            labels::BLOCK_REASON,
            one_line(&task.block_reason)
        ));
    }
    for line in &task.extra_lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("\n---\n");
}

fn push_unreadable(out: &mut String, block: &RawBlock) {
    out.push('\n');
    for line in &block.lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("\n---\n");
}

/// Render the whole board: summary block, every task in order, then the
/// fixed legend.
///
/// Counts are always derived from `tasks`; blocked and review tasks are
/// reported as pending. A missing `last_sync` is written as the empty
/// placeholder.
#[must_use]
pub fn generate_board(tasks: &[Task], metadata: &BoardMetadata) -> String {
    render(tasks, &[], metadata)
}

/// Render a parsed board, writing unreadable blocks back after the tasks.
/// They are not counted in the summary.
#[must_use]
pub fn write_board(board: &Board) -> String {
    render(&board.tasks, &board.unreadable, &board.metadata)
}

fn render(tasks: &[Task], unreadable: &[RawBlock], metadata: &BoardMetadata) -> String {
    let completed = count(tasks, |s| s == Status::Completed);
    let in_progress = count(tasks, |s| s == Status::InProgress);
    let pending = count(tasks, |s| {
        matches!(s, Status::Pending | Status::Blocked | Status::Review)
    });

    let mut out = String::from("# Backlog de Tareas\n\n");
    out.push_str(&format!(
        "> {} {}\n",
        labels::LAST_SYNC,
        metadata.last_sync.as_deref().unwrap_or(labels::EMPTY)
    ));
    out.push_str(&format!(
        "> {} {} | {} {completed} | {} {in_progress} | {} {pending}\n\n---\n",
        labels::TOTAL,
        tasks.len(),
        labels::COMPLETED_COUNT,
        labels::IN_PROGRESS_COUNT,
        labels::PENDING_COUNT,
    ));

    for task in tasks {
        push_task(&mut out, task);
    }
    for block in unreadable {
        push_unreadable(&mut out, block);
    }
    out.push_str(TRAILER);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::parse_board;
    use crate::model::Criterion;

    fn metadata() -> BoardMetadata {
        BoardMetadata {
            last_sync: Some("2024-01-15 09:00:00".into()),
            ..BoardMetadata::default()
        }
    }

    #[test]
    fn empty_board_has_summary_and_legend() {
        let out = generate_board(&[], &metadata());
        assert!(out.starts_with(
            "# Backlog de Tareas\n\n> Última sincronización: 2024-01-15 09:00:00\n\
             > Total tareas: 0 | Completadas: 0 | En progreso: 0 | Pendientes: 0\n\n---\n"
        ));
        assert!(out.contains("## Leyenda de Estados"));
        assert!(out.ends_with("`gco task status TASK-NNN review`\n"));
    }

    #[test]
    fn task_block_layout() {
        let mut task = Task::new("TASK-001", "Login");
        task.status = Status::InProgress;
        task.assigned = "@vscode".into();
        task.description = "Formulario".into();
        task.criteria = vec![
            Criterion {
                done: true,
                text: "email".into(),
            },
            Criterion::open("password"),
        ];
        let out = generate_board(&[task], &metadata());
        let expected = "
## TASK-001 [STATUS:in-progress] [ASSIGNED:@vscode]
**Título:** Login
**Descripción:** Formulario
**Criterios de aceptación:**
- [x] email
- [ ] password
**Dependencias:** Ninguna
**Notas técnicas:**
(vacío)
**Completada:** (vacío)

---
";
        assert!(out.contains(expected), "{out}");
    }

    #[test]
    fn blocked_fields_only_for_blocked_tasks() {
        let mut blocked = Task::new("TASK-001", "A");
        blocked.status = Status::Blocked;
        blocked.blocked_since = "2024-01-16 10:00:00".into();
        blocked.block_reason = "API".into();
        let mut pending = Task::new("TASK-002", "B");
        pending.block_reason = "stale".into();

        let out = generate_board(&[blocked, pending], &metadata());
        assert_eq!(out.matches(labels::BLOCK_REASON).count(), 1);
        assert!(out.contains("**Razón bloqueo:** API\n"));
    }

    #[test]
    fn counts_fold_blocked_and_review_into_pending() {
        let tasks: Vec<Task> = Status::ALL
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut t = Task::new(format!("TASK-00{}", i + 1), "t");
                t.status = *s;
                t
            })
            .collect();
        let out = generate_board(&tasks, &BoardMetadata::default());
        assert!(out.contains("> Última sincronización: (vacío)\n"));
        assert!(out.contains("Total tareas: 5 | Completadas: 1 | En progreso: 1 | Pendientes: 3"));
    }

    #[test]
    fn issue_and_extra_lines_survive_round_trip() {
        let mut task = Task::new("TASK-007", "Sync");
        task.github_issue = Some(12);
        task.notes = "- a\n- b".into();
        task.extra_lines = vec!["**Prioridad:** alta".into()];
        let out = generate_board(std::slice::from_ref(&task), &metadata());
        let board = parse_board(&out);
        assert_eq!(board.tasks, vec![task]);
        assert_eq!(board.metadata.total, Some(1));
    }

    #[test]
    fn notes_cannot_inject_a_task() {
        let mut task = Task::new("TASK-001", "A");
        task.notes = "pasos:\n## TASK-009 [STATUS:pending] [ASSIGNED:]\n**Título:** fantasma\n---".into();
        task.description = "uno\n# Sección\n(vacío)".into();
        let out = generate_board(std::slice::from_ref(&task), &metadata());
        assert!(out.contains("\n\\## TASK-009 [STATUS:pending]"));

        let board = parse_board(&out);
        assert_eq!(board.tasks, vec![task]);
        assert!(board.unreadable.is_empty());
        assert_eq!(board.next_id(), "TASK-002");
    }

    #[test]
    fn single_line_fields_drop_line_breaks() {
        let mut task = Task::new("TASK-001", "uno\n## TASK-002 [STATUS:pending] [ASSIGNED:]");
        task.status = Status::Blocked;
        task.block_reason = "a\r\nb".into();
        let out = generate_board(&[task], &metadata());
        let board = parse_board(&out);
        assert_eq!(board.tasks.len(), 1);
        assert_eq!(
            board.tasks[0].title,
            "uno ## TASK-002 [STATUS:pending] [ASSIGNED:]"
        );
        assert_eq!(board.tasks[0].block_reason, "a b");
    }

    #[test]
    fn unreadable_blocks_are_written_back_uncounted() {
        let board = Board {
            tasks: vec![Task::new("TASK-001", "A")],
            unreadable: vec![RawBlock {
                id: "TASK-002".into(),
                lines: vec![
                    "## TASK-002 [STATUS:done] [ASSIGNED:]".into(),
                    "**Título:** B".into(),
                ],
            }],
            metadata: metadata(),
        };
        let out = write_board(&board);
        assert!(out.contains("Total tareas: 1 |"));
        assert!(out.contains(
            "\n## TASK-002 [STATUS:done] [ASSIGNED:]\n**Título:** B\n\n---\n"
        ));
        let reparsed = parse_board(&out);
        assert_eq!(reparsed.tasks, board.tasks);
        assert_eq!(reparsed.unreadable, board.unreadable);
        assert_eq!(write_board(&reparsed), out);
    }
}
