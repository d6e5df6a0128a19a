use galley_core::{
    AdjustmentStatus, CostAdjustmentRecord, DocumentStatus, ProductionRecord, PurchaseOrder,
    PurchaseStatus, SaleRecord, SaleStatus, StocktakeRecord, TransferRecord, WasteRecord,
};
use galley_store::Record;
use uuid::Uuid;

/// A transaction document with a one-way posting lifecycle.
pub trait Document: Record {
    const KIND: &'static str;
    /// Status name once posting has happened.
    const FINAL_STATUS: &'static str;

    fn document_id(&self) -> Uuid;
    fn is_final(&self) -> bool;
    /// Location ids named in the header.
    fn locations(&self) -> Vec<&str>;
    fn line_count(&self) -> usize;
}

impl Document for PurchaseOrder {
    const KIND: &'static str = "purchase order";
    const FINAL_STATUS: &'static str = "completed";

    fn document_id(&self) -> Uuid {
        self.id
    }

    fn is_final(&self) -> bool {
        self.status == PurchaseStatus::Completed
    }

    fn locations(&self) -> Vec<&str> {
        vec![self.location_id.as_str()]
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }
}

impl Document for ProductionRecord {
    const KIND: &'static str = "production record";
    const FINAL_STATUS: &'static str = "posted";

    fn document_id(&self) -> Uuid {
        self.id
    }

    fn is_final(&self) -> bool {
        self.status == DocumentStatus::Posted
    }

    fn locations(&self) -> Vec<&str> {
        vec![self.location_id.as_str()]
    }

    fn line_count(&self) -> usize {
        self.ingredients.len()
    }
}

impl Document for WasteRecord {
    const KIND: &'static str = "waste record";
    const FINAL_STATUS: &'static str = "posted";

    fn document_id(&self) -> Uuid {
        self.id
    }

    fn is_final(&self) -> bool {
        self.status == DocumentStatus::Posted
    }

    fn locations(&self) -> Vec<&str> {
        vec![self.location_id.as_str()]
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }
}

impl Document for TransferRecord {
    const KIND: &'static str = "transfer";
    const FINAL_STATUS: &'static str = "posted";

    fn document_id(&self) -> Uuid {
        self.id
    }

    fn is_final(&self) -> bool {
        self.status == DocumentStatus::Posted
    }

    fn locations(&self) -> Vec<&str> {
        vec![
            self.source_location_id.as_str(),
            self.destination_location_id.as_str(),
        ]
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }
}

impl Document for StocktakeRecord {
    const KIND: &'static str = "stocktake";
    const FINAL_STATUS: &'static str = "posted";

    fn document_id(&self) -> Uuid {
        self.id
    }

    fn is_final(&self) -> bool {
        self.status == DocumentStatus::Posted
    }

    fn locations(&self) -> Vec<&str> {
        vec![self.location_id.as_str()]
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }
}

impl Document for CostAdjustmentRecord {
    const KIND: &'static str = "cost adjustment";
    const FINAL_STATUS: &'static str = "closed";

    fn document_id(&self) -> Uuid {
        self.id
    }

    fn is_final(&self) -> bool {
        self.status == AdjustmentStatus::Closed
    }

    fn locations(&self) -> Vec<&str> {
        Vec::new()
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }
}

impl Document for SaleRecord {
    const KIND: &'static str = "sale";
    const FINAL_STATUS: &'static str = "completed";

    fn document_id(&self) -> Uuid {
        self.id
    }

    fn is_final(&self) -> bool {
        self.status == SaleStatus::Completed
    }

    fn locations(&self) -> Vec<&str> {
        vec![self.location_id.as_str()]
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }
}
