//! Commands over row attributes and descriptive fields.

use datacol_engine::{ColumnData, ColumnStorage, DataAndValidity, Interval, IntervalAttribute, PlotDesignation};

use super::{ColumnRef, UndoCommand, swap_data};
use crate::events::{ChangeSink, ColumnEvent};

/// Empty the column, keeping its mode.
pub struct ClearColumnCommand {
    column: ColumnRef,
    backup: Option<DataAndValidity>,
    text: String,
}

impl ClearColumnCommand {
    pub fn new(column: ColumnRef) -> Self {
        let text = format!("clear column {}", column.name());
        ClearColumnCommand {
            column,
            backup: None,
            text,
        }
    }
}

impl UndoCommand for ClearColumnCommand {
    fn text(&self) -> &str {
        &self.text
    }

    fn redo(&mut self, sink: &mut dyn ChangeSink) {
        if self.backup.is_none() {
            let empty = ColumnData::empty(self.column.borrow().data_type());
            self.backup = Some((empty, IntervalAttribute::new()));
        }
        swap_data(&self.column, &mut self.backup);
        self.column.changed(sink, None);
    }

    fn undo(&mut self, sink: &mut dyn ChangeSink) {
        swap_data(&self.column, &mut self.backup);
        self.column.changed(sink, None);
    }
}

/// Which boolean row attribute a [`FlagCommand`] edits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagKind {
    Validity,
    Masking,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagChange {
    Clear,
    Set(Interval, bool),
}

/// Set or clear invalid/masked flags. Undo restores the whole store.
pub struct FlagCommand {
    column: ColumnRef,
    kind: FlagKind,
    change: FlagChange,
    /// Store before the first redo while applied, after it while reverted.
    other: Option<IntervalAttribute<bool>>,
    text: String,
}

impl FlagCommand {
    pub fn new(column: ColumnRef, kind: FlagKind, change: FlagChange) -> Self {
        let name = column.name();
        let text = match (kind, change) {
            (FlagKind::Validity, FlagChange::Clear) => format!("clear validity of column {}", name),
            (FlagKind::Masking, FlagChange::Clear) => format!("clear masks of column {}", name),
            (FlagKind::Validity, FlagChange::Set(iv, true)) => format!("mark {} of column {} invalid", iv, name),
            (FlagKind::Validity, FlagChange::Set(iv, false)) => format!("mark {} of column {} valid", iv, name),
            (FlagKind::Masking, FlagChange::Set(iv, true)) => format!("mask {} of column {}", iv, name),
            (FlagKind::Masking, FlagChange::Set(iv, false)) => format!("unmask {} of column {}", iv, name),
        };
        FlagCommand {
            column,
            kind,
            change,
            other: None,
            text,
        }
    }

    fn store(kind: FlagKind, storage: &ColumnStorage) -> &IntervalAttribute<bool> {
        match kind {
            FlagKind::Validity => storage.validity(),
            FlagKind::Masking => storage.masking(),
        }
    }

    fn swap(&mut self) {
        if let Some(store) = self.other.take() {
            let mut storage = self.column.borrow_mut();
            self.other = Some(match self.kind {
                FlagKind::Validity => storage.replace_validity(store),
                FlagKind::Masking => storage.replace_masking(store),
            });
        }
    }

    fn rows(&self) -> Option<Interval> {
        match self.change {
            FlagChange::Clear => None,
            FlagChange::Set(interval, _) => Some(interval),
        }
    }
}

impl UndoCommand for FlagCommand {
    fn text(&self) -> &str {
        &self.text
    }

    fn redo(&mut self, sink: &mut dyn ChangeSink) {
        if self.other.is_some() {
            self.swap();
        } else {
            let mut storage = self.column.borrow_mut();
            self.other = Some(Self::store(self.kind, &storage).clone());
            match (self.kind, self.change) {
                (FlagKind::Validity, FlagChange::Clear) => storage.clear_validity(),
                (FlagKind::Masking, FlagChange::Clear) => storage.clear_masks(),
                (FlagKind::Validity, FlagChange::Set(iv, flag)) => storage.set_invalid(iv, flag),
                (FlagKind::Masking, FlagChange::Set(iv, flag)) => storage.set_masked(iv, flag),
            }
        }
        self.column.changed(sink, self.rows());
    }

    fn undo(&mut self, sink: &mut dyn ChangeSink) {
        self.swap();
        self.column.changed(sink, self.rows());
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormulaChange {
    Clear,
    Set(Interval, String),
}

/// Set a formula over an interval, or clear all formulas.
pub struct FormulaCommand {
    column: ColumnRef,
    change: FormulaChange,
    other: Option<IntervalAttribute<String>>,
    text: String,
}

impl FormulaCommand {
    pub fn new(column: ColumnRef, change: FormulaChange) -> Self {
        let text = match &change {
            FormulaChange::Clear => format!("clear formulas of column {}", column.name()),
            FormulaChange::Set(iv, _) => format!("set formula for {} of column {}", iv, column.name()),
        };
        FormulaCommand {
            column,
            change,
            other: None,
            text,
        }
    }

    fn rows(&self) -> Option<Interval> {
        match &self.change {
            FormulaChange::Clear => None,
            FormulaChange::Set(interval, _) => Some(*interval),
        }
    }
}

impl UndoCommand for FormulaCommand {
    fn text(&self) -> &str {
        &self.text
    }

    fn redo(&mut self, sink: &mut dyn ChangeSink) {
        {
            let mut storage = self.column.borrow_mut();
            match self.other.take() {
                Some(store) => self.other = Some(storage.replace_formulas(store)),
                None => {
                    self.other = Some(storage.formulas().clone());
                    match &self.change {
                        FormulaChange::Clear => storage.clear_formulas(),
                        FormulaChange::Set(iv, formula) => storage.set_formula(*iv, formula.as_str()),
                    }
                }
            }
        }
        self.column.changed(sink, self.rows());
    }

    fn undo(&mut self, sink: &mut dyn ChangeSink) {
        if let Some(store) = self.other.take() {
            self.other = Some(self.column.borrow_mut().replace_formulas(store));
        }
        self.column.changed(sink, self.rows());
    }
}

pub struct SetPlotDesignationCommand {
    column: ColumnRef,
    designation: PlotDesignation,
    text: String,
}

impl SetPlotDesignationCommand {
    pub fn new(column: ColumnRef, designation: PlotDesignation) -> Self {
        let text = format!("set plot designation of column {}", column.name());
        SetPlotDesignationCommand {
            column,
            designation,
            text,
        }
    }

    // old and new designation trade places on every call
    fn swap(&mut self, sink: &mut dyn ChangeSink) {
        {
            let mut storage = self.column.borrow_mut();
            let previous = storage.plot_designation();
            storage.set_plot_designation(self.designation);
            self.designation = previous;
        }
        sink.notify(ColumnEvent::PlotDesignationChanged {
            column: self.column.id(),
        });
    }
}

impl UndoCommand for SetPlotDesignationCommand {
    fn text(&self) -> &str {
        &self.text
    }

    fn redo(&mut self, sink: &mut dyn ChangeSink) {
        self.swap(sink);
    }

    fn undo(&mut self, sink: &mut dyn ChangeSink) {
        self.swap(sink);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DescriptionField {
    Name,
    Comment,
}

/// Rename a column or change its comment.
pub struct DescriptionCommand {
    column: ColumnRef,
    field: DescriptionField,
    value: String,
    text: String,
}

impl DescriptionCommand {
    pub fn new(column: ColumnRef, field: DescriptionField, value: impl Into<String>) -> Self {
        let value = value.into();
        let text = match field {
            DescriptionField::Name => format!("rename column {} to {}", column.name(), value),
            DescriptionField::Comment => format!("change comment of column {}", column.name()),
        };
        DescriptionCommand {
            column,
            field,
            value,
            text,
        }
    }

    fn swap(&mut self, sink: &mut dyn ChangeSink) {
        {
            let mut storage = self.column.borrow_mut();
            let value = std::mem::take(&mut self.value);
            self.value = match self.field {
                DescriptionField::Name => {
                    let previous = storage.name().to_string();
                    storage.set_name(value);
                    previous
                }
                DescriptionField::Comment => {
                    let previous = storage.comment().to_string();
                    storage.set_comment(value);
                    previous
                }
            };
        }
        sink.notify(ColumnEvent::DescriptionChanged {
            column: self.column.id(),
        });
    }
}

impl UndoCommand for DescriptionCommand {
    fn text(&self) -> &str {
        &self.text
    }

    fn redo(&mut self, sink: &mut dyn ChangeSink) {
        self.swap(sink);
    }

    fn undo(&mut self, sink: &mut dyn ChangeSink) {
        self.swap(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;

    #[test]
    fn test_clear_column_keeps_mode() {
        let column = numeric(&[1.0, 2.0]);
        column.borrow_mut().set_invalid(Interval::single(0), true);
        let mut command = ClearColumnCommand::new(column.clone());
        check_cycle(&column, &mut command);
        assert_eq!(column.borrow().row_count(), 0);
        assert!(column.borrow().validity().is_empty());
        assert_eq!(column.borrow().data(), &ColumnData::Numeric(vec![]));
    }

    #[test]
    fn test_flag_commands() {
        let column = numeric(&[1.0, 2.0, 3.0, 4.0]);
        column.borrow_mut().set_invalid(Interval::single(3), true);

        let mut mark = FlagCommand::new(
            column.clone(),
            FlagKind::Validity,
            FlagChange::Set(Interval::new(0, 1), true),
        );
        check_cycle(&column, &mut mark);
        assert_eq!(column.borrow().validity().flagged(), vec![Interval::new(0, 1), Interval::single(3)]);

        let mut clear = FlagCommand::new(column.clone(), FlagKind::Validity, FlagChange::Clear);
        check_cycle(&column, &mut clear);
        assert!(column.borrow().validity().is_empty());

        let mut mask = FlagCommand::new(column.clone(), FlagKind::Masking, FlagChange::Set(Interval::single(2), true));
        check_cycle(&column, &mut mask);
        assert!(column.borrow().is_masked(2));
        assert_eq!(mask.text(), "mask [2,2] of column x");
    }

    #[test]
    fn test_formula_split() {
        let column = numeric(&[0.0; 8]);
        let mut first = FormulaCommand::new(column.clone(), FormulaChange::Set(Interval::new(0, 4), "f1".into()));
        check_cycle(&column, &mut first);
        let mut second = FormulaCommand::new(column.clone(), FormulaChange::Set(Interval::new(2, 6), "f2".into()));
        check_cycle(&column, &mut second);
        assert_eq!(
            column.borrow().formulas().entries(),
            &[
                (Interval::new(0, 1), "f1".to_string()),
                (Interval::new(2, 6), "f2".to_string())
            ]
        );

        let mut clear = FormulaCommand::new(column.clone(), FormulaChange::Clear);
        check_cycle(&column, &mut clear);
        assert!(column.borrow().formulas().is_empty());
    }

    #[test]
    fn test_plot_designation_and_description() {
        let column = numeric(&[]);
        let mut pd = SetPlotDesignationCommand::new(column.clone(), PlotDesignation::YError);
        check_cycle(&column, &mut pd);
        assert_eq!(column.borrow().plot_designation(), PlotDesignation::YError);

        let mut rename = DescriptionCommand::new(column.clone(), DescriptionField::Name, "y");
        assert_eq!(rename.text(), "rename column x to y");
        check_cycle(&column, &mut rename);
        assert_eq!(column.borrow().name(), "y");

        let mut comment = DescriptionCommand::new(column.clone(), DescriptionField::Comment, "measured");
        check_cycle(&column, &mut comment);
        assert_eq!(column.borrow().comment(), "measured");
    }
}
