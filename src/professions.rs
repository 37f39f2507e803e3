// ===============================
// src/professions.rs
// ===============================
use rust_decimal::Decimal;

use crate::finance::{
    Liability, Profession, CAR_LOAN_TERM, CREDIT_CARD_RATE, CREDIT_CARD_TERM, MORTGAGE_TERM,
    STUDENT_LOANS_TERM,
};

struct Row {
    name: &'static str,
    salary: i64,
    child: i64,
    other: i64,
    savings: i64,
    car: i64,
    mortgage: i64,
    /// 0 = no student loans
    student: i64,
    card: i64,
}

#[rustfmt::skip]
const ROWS: &[Row] = &[
    Row { name: "Software Engineer",   salary: 3100,  child: 170, other: 710,  savings: 500,  car: 5000,  mortgage: 47000,  student: 6000,   card: 4000 },
    Row { name: "Software Developer",  salary: 2800,  child: 150, other: 650,  savings: 400,  car: 4000,  mortgage: 38000,  student: 8000,   card: 3000 },
    Row { name: "Software Architect",  salary: 4200,  child: 200, other: 900,  savings: 800,  car: 7000,  mortgage: 65000,  student: 12000,  card: 5000 },
    Row { name: "Software Tester",     salary: 2400,  child: 140, other: 580,  savings: 300,  car: 3500,  mortgage: 32000,  student: 5000,   card: 2000 },
    Row { name: "Software Analyst",    salary: 2600,  child: 150, other: 620,  savings: 350,  car: 4500,  mortgage: 36000,  student: 7000,   card: 2500 },
    Row { name: "Software Manager",    salary: 4800,  child: 220, other: 1050, savings: 1000, car: 8000,  mortgage: 75000,  student: 10000,  card: 6000 },
    Row { name: "Software Consultant", salary: 3600,  child: 180, other: 800,  savings: 600,  car: 6000,  mortgage: 52000,  student: 9000,   card: 4000 },
    Row { name: "Janitor",             salary: 1600,  child: 100, other: 300,  savings: 560,  car: 2000,  mortgage: 20000,  student: 0,      card: 1000 },
    Row { name: "Secretary",           salary: 2500,  child: 140, other: 570,  savings: 710,  car: 3000,  mortgage: 38000,  student: 3000,   card: 2000 },
    Row { name: "Truck Driver",        salary: 2500,  child: 140, other: 570,  savings: 750,  car: 3500,  mortgage: 35000,  student: 0,      card: 2500 },
    Row { name: "Mechanic",            salary: 2000,  child: 110, other: 450,  savings: 670,  car: 2500,  mortgage: 24000,  student: 0,      card: 1500 },
    Row { name: "Nurse",               salary: 3100,  child: 170, other: 710,  savings: 480,  car: 5000,  mortgage: 47000,  student: 6000,   card: 3000 },
    Row { name: "Teacher",             salary: 3300,  child: 180, other: 760,  savings: 400,  car: 5000,  mortgage: 50000,  student: 12000,  card: 3000 },
    Row { name: "Police Officer",      salary: 3000,  child: 160, other: 690,  savings: 520,  car: 4000,  mortgage: 46000,  student: 0,      card: 3000 },
    Row { name: "Airline Pilot",       salary: 9500,  child: 480, other: 2210, savings: 3000, car: 15000, mortgage: 142000, student: 18000,  card: 8000 },
    Row { name: "Lawyer",              salary: 7500,  child: 380, other: 1650, savings: 2100, car: 11000, mortgage: 115000, student: 78000,  card: 6000 },
    Row { name: "Doctor",              salary: 13200, child: 640, other: 2880, savings: 3950, car: 19000, mortgage: 202000, student: 150000, card: 9000 },
    Row { name: "Business Manager",    salary: 4600,  child: 240, other: 1020, savings: 900,  car: 7000,  mortgage: 75000,  student: 12000,  card: 5000 },
    Row { name: "Engineer",            salary: 4900,  child: 250, other: 1090, savings: 1200, car: 7500,  mortgage: 75000,  student: 12000,  card: 5000 },
];

impl Row {
    fn to_profession(&self) -> Profession {
        let mut liabilities = vec![
            Liability::new("Car", Decimal::from(self.car), Decimal::new(5, 2), CAR_LOAN_TERM),
            Liability::new("Mortgage", Decimal::from(self.mortgage), Decimal::new(6, 2), MORTGAGE_TERM),
        ];
        if self.student > 0 {
            liabilities.push(Liability::new(
                "Student Loans",
                Decimal::from(self.student),
                Decimal::new(5, 2),
                STUDENT_LOANS_TERM,
            ));
        }
        liabilities.push(Liability::new("Credit Card", Decimal::from(self.card), CREDIT_CARD_RATE, CREDIT_CARD_TERM));

        Profession {
            name: self.name.to_string(),
            salary: Decimal::from(self.salary),
            child_expense: Decimal::from(self.child),
            other_expenses: Decimal::from(self.other),
            savings: Decimal::from(self.savings),
            assets: Vec::new(),
            liabilities,
        }
    }
}

/// Every selectable profession, in display order.
pub fn catalog() -> Vec<Profession> {
    ROWS.iter().map(Row::to_profession).collect()
}

/// Case-insensitive lookup by name.
pub fn find(name: &str) -> Option<Profession> {
    ROWS.iter()
        .find(|r| r.name.eq_ignore_ascii_case(name.trim()))
        .map(Row::to_profession)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_complete() {
        let all = catalog();
        assert_eq!(all.len(), 19);
        assert!(all.iter().all(|p| p.salary > p.other_expenses));
    }

    #[test]
    fn some_professions_carry_no_student_loans() {
        let janitor = find("janitor").unwrap();
        assert_eq!(janitor.liabilities.len(), 3);
        assert!(janitor.liabilities.iter().all(|l| l.name != "Student Loans"));

        let doctor = find("Doctor").unwrap();
        assert_eq!(doctor.liabilities.len(), 4);
        assert!(doctor.liabilities.iter().any(|l| l.is_revolving()));
    }

    #[test]
    fn unknown_profession() {
        assert!(find("Astronaut").is_none());
    }
}
