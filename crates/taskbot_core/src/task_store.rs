use crate::error::AppError;
use crate::model::{Task, TaskId, now_local};
use crate::storage::line_store;
use std::path::PathBuf;

/// The ordered task list and its backing file.
///
/// Every mutation is written to disk before it becomes visible in memory, so
/// a failed write leaves the store exactly as it was.
#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    tasks: Vec<Task>,
    next_id: TaskId,
}

impl TaskStore {
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, AppError> {
        let path = path.into();
        let tasks = line_store::load_tasks(&path)?;
        let next_id = tasks.iter().map(|task| task.id).max().unwrap_or(0) + 1;
        log::info!("loaded {} tasks from {}", tasks.len(), path.display());
        Ok(Self {
            path,
            tasks,
            next_id,
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    /// Current zero-based index of the task with `id`.
    pub fn position_of(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    pub fn add(&mut self, text: &str) -> Result<Task, AppError> {
        let task = Task::new(self.next_id, text.to_string(), now_local());
        let mut tasks = self.tasks.clone();
        tasks.push(task.clone());
        self.commit(tasks)?;
        self.next_id += 1;
        Ok(task)
    }

    /// Tasks with their 1-based positions.
    pub fn list(&self) -> Vec<(usize, &Task)> {
        self.tasks
            .iter()
            .enumerate()
            .map(|(index, task)| (index + 1, task))
            .collect()
    }

    pub fn clear(&mut self) -> Result<(), AppError> {
        self.commit(Vec::new())
    }

    pub fn mark_done(&mut self, index: usize) -> Result<&Task, AppError> {
        let mut tasks = self.tasks.clone();
        tasks
            .get_mut(index)
            .ok_or_else(AppError::index_out_of_range)?
            .mark_done(now_local())?;
        self.commit(tasks)?;
        Ok(&self.tasks[index])
    }

    pub fn modify(&mut self, index: usize, new_text: &str) -> Result<&Task, AppError> {
        let mut tasks = self.tasks.clone();
        tasks
            .get_mut(index)
            .ok_or_else(AppError::index_out_of_range)?
            .text = new_text.to_string();
        self.commit(tasks)?;
        Ok(&self.tasks[index])
    }

    /// Moves done tasks behind the unfinished ones, keeping relative order in
    /// both groups. Returns the number of unfinished tasks.
    pub fn refresh(&mut self) -> Result<usize, AppError> {
        let (mut reordered, done): (Vec<Task>, Vec<Task>) =
            self.tasks.iter().cloned().partition(|task| !task.is_done());
        let unfinished = reordered.len();
        reordered.extend(done);
        self.commit(reordered)?;
        Ok(unfinished)
    }

    /// Unfinished tasks numbered 1..k within this view, not by list position.
    pub fn unfinished(&self) -> Vec<(usize, &Task)> {
        self.tasks
            .iter()
            .filter(|task| !task.is_done())
            .enumerate()
            .map(|(index, task)| (index + 1, task))
            .collect()
    }

    fn commit(&mut self, tasks: Vec<Task>) -> Result<(), AppError> {
        line_store::save_tasks(&self.path, &tasks)?;
        self.tasks = tasks;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::TaskStore;
    use crate::model::{format_date, now_local};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("taskbot-{nanos}-{file_name}"))
    }

    fn store_with(path: &PathBuf, texts: &[&str]) -> TaskStore {
        let mut store = TaskStore::open(path).unwrap();
        for text in texts {
            store.add(text).unwrap();
        }
        store
    }

    #[test]
    fn add_appends_unfinished_task_at_last_position() {
        let path = temp_path("add.txt");
        let store = store_with(&path, &["first", "buy milk"]);
        std::fs::remove_file(&path).ok();

        let listed = store.list();
        let (position, task) = listed.last().unwrap();
        assert_eq!(*position, 2);
        assert_eq!(task.text, "buy milk");
        assert!(!task.is_done());
        assert_eq!(task.date_done, None);
        assert_eq!(task.date_added.date_text(), format_date(now_local()));
    }

    #[test]
    fn mark_done_rejects_bad_index_and_repeat() {
        let path = temp_path("done.txt");
        let mut store = store_with(&path, &["a"]);

        assert_eq!(store.mark_done(3).unwrap_err().code(), "index_out_of_range");

        let first = store.mark_done(0).unwrap().date_done.clone();
        let err = store.mark_done(0).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert_eq!(err.code(), "already_done");
        assert_eq!(store.get(0).unwrap().date_done, first);
        assert!(first.is_some());
    }

    #[test]
    fn modify_overwrites_text_and_persists() {
        let path = temp_path("modify.txt");
        let mut store = store_with(&path, &["old"]);

        store.modify(0, "new").unwrap();
        let reopened = TaskStore::open(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(reopened.get(0).unwrap().text, "new");
    }

    #[test]
    fn modify_rejects_out_of_range() {
        let path = temp_path("modify-range.txt");
        let mut store = store_with(&path, &["old"]);
        let err = store.modify(1, "new").unwrap_err();
        std::fs::remove_file(&path).ok();

        assert_eq!(err.code(), "index_out_of_range");
        assert_eq!(store.get(0).unwrap().text, "old");
    }

    #[test]
    fn refresh_partitions_stably() {
        let path = temp_path("refresh.txt");
        let mut store = store_with(&path, &["a", "b", "c", "d", "e"]);
        store.mark_done(0).unwrap();
        store.mark_done(3).unwrap();

        let unfinished = store.refresh().unwrap();
        std::fs::remove_file(&path).ok();

        let order: Vec<&str> = store
            .list()
            .into_iter()
            .map(|(_, task)| task.text.as_str())
            .collect();
        assert_eq!(unfinished, 3);
        assert_eq!(order, vec!["b", "c", "e", "a", "d"]);
    }

    #[test]
    fn unfinished_renumbers_within_view() {
        let path = temp_path("unfinished.txt");
        let mut store = store_with(&path, &["a", "b", "c"]);
        store.mark_done(0).unwrap();
        std::fs::remove_file(&path).ok();

        let view: Vec<(usize, &str)> = store
            .unfinished()
            .into_iter()
            .map(|(position, task)| (position, task.text.as_str()))
            .collect();
        assert_eq!(view, vec![(1, "b"), (2, "c")]);
    }

    #[test]
    fn clear_empties_and_persists() {
        let path = temp_path("clear.txt");
        let mut store = store_with(&path, &["a", "b"]);
        store.clear().unwrap();
        let reopened = TaskStore::open(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(store.is_empty());
        assert!(reopened.is_empty());
    }

    #[test]
    fn reopen_reproduces_list() {
        let path = temp_path("reopen.txt");
        let mut store = store_with(&path, &["a", "b"]);
        store.mark_done(1).unwrap();

        let reopened = TaskStore::open(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let original: Vec<_> = store.list().into_iter().map(|(_, t)| t.clone()).collect();
        let loaded: Vec<_> = reopened.list().into_iter().map(|(_, t)| t.clone()).collect();
        assert_eq!(loaded, original);
    }

    #[test]
    fn legacy_records_survive_the_next_write() {
        let path = temp_path("legacy.txt");
        std::fs::write(
            &path,
            "1|legacy item|done|2025-05-26 10:00|\n2|other|todo|2025-05-26 10:00:30|\n",
        )
        .unwrap();

        let mut store = TaskStore::open(&path).unwrap();
        store.add("new").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "1|legacy item|done|2025-05-26 10:00|2025-05-26 10:00");
        assert_eq!(lines[1], "2|other|todo|2025-05-26 10:00:30|");
        assert!(lines[2].starts_with("3|new|todo|"));
    }

    #[test]
    fn ids_stay_unique_after_reopen() {
        let path = temp_path("ids.txt");
        store_with(&path, &["a", "b"]);
        let mut reopened = TaskStore::open(&path).unwrap();
        let added = reopened.add("c").unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(added.id, 3);
        assert_eq!(reopened.position_of(added.id), Some(2));
    }

    #[test]
    fn failed_write_leaves_store_unchanged() {
        let dir = temp_path("not-a-dir");
        std::fs::write(&dir, "blocker").unwrap();
        let mut store = TaskStore::open(dir.join("tasks.txt")).unwrap();

        let err = store.add("a").unwrap_err();
        std::fs::remove_file(&dir).ok();

        assert_eq!(err.code(), "io_error");
        assert!(store.is_empty());
    }
}
