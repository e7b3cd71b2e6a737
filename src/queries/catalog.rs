//! The analytical SQL, one statement per question.
//!
//! Statements use named parameters (`:index_id`, `:excluded_sector`, ...)
//! that [`QueryParams`](super::QueryParams) supplies.

use super::NamedQuery;

pub const TOP10_CONCENTRATION: NamedQuery = NamedQuery {
    name: "uc1_q1_top10_concentration",
    title: "Top 10 constituent weight per year",
    sql: "
        WITH yearly_top10 AS (
            SELECT
                strftime('%Y', im.as_of_date) AS year,
                im.company_id,
                c.company_name,
                im.weight,
                ROW_NUMBER() OVER (PARTITION BY strftime('%Y', im.as_of_date)
                                   ORDER BY im.weight DESC) AS rank
            FROM index_membership im
            JOIN companies c ON im.company_id = c.company_id
            WHERE im.index_id = :index_id AND im.weight IS NOT NULL
        )
        SELECT year, SUM(weight) AS top10_weight_pct, COUNT(*) AS top10_count
        FROM yearly_top10
        WHERE rank <= 10
        GROUP BY year
        ORDER BY year",
};

pub const HHI_CONCENTRATION: NamedQuery = NamedQuery {
    name: "uc1_q2_hhi_concentration",
    title: "Herfindahl-Hirschman index per year",
    sql: "
        WITH hhi_calc AS (
            SELECT
                strftime('%Y', im.as_of_date) AS year,
                SUM(im.weight * im.weight) AS hhi,
                COUNT(*) AS num_members,
                AVG(im.weight) AS avg_weight,
                MAX(im.weight) AS max_weight
            FROM index_membership im
            WHERE im.index_id = :index_id AND im.weight IS NOT NULL
            GROUP BY strftime('%Y', im.as_of_date)
        )
        SELECT
            year,
            ROUND(hhi, 2) AS hhi_index,
            num_members,
            ROUND(avg_weight, 2) AS avg_weight_pct,
            ROUND(max_weight, 2) AS largest_weight_pct,
            ROUND(10000.0 / hhi, 1) AS effective_positions,
            CASE
                WHEN hhi < 1500 THEN 'Unconcentrated'
                WHEN hhi < 2500 THEN 'Moderately Concentrated'
                ELSE 'Highly Concentrated'
            END AS concentration_level
        FROM hhi_calc
        ORDER BY year",
};

pub const DEBT_TO_REVENUE: NamedQuery = NamedQuery {
    name: "uc2_q1_debt_to_revenue_distribution",
    title: "Debt-to-revenue distribution per year",
    sql: "
        WITH de_ratios AS (
            SELECT
                strftime('%Y', f.period_end_date) AS year,
                f.company_id,
                f.total_debt / f.revenue AS debt_to_revenue_ratio
            FROM financials f
            JOIN companies c ON f.company_id = c.company_id
            WHERE f.period_type = 'ANNUAL'
              AND c.gics_sector_name != :excluded_sector
              AND f.total_debt IS NOT NULL
              AND f.revenue > 0
        )
        SELECT
            year,
            COUNT(*) AS company_count,
            ROUND(AVG(debt_to_revenue_ratio), 3) AS mean_debt_to_revenue,
            ROUND(MIN(debt_to_revenue_ratio), 3) AS min_ratio,
            ROUND(MAX(debt_to_revenue_ratio), 3) AS max_ratio
        FROM de_ratios
        GROUP BY year
        ORDER BY year",
};

pub const DELEVERAGING_CYCLES: NamedQuery = NamedQuery {
    name: "uc2_q2_deleveraging_cycles",
    title: "Companies with two consecutive years of falling debt-to-revenue",
    sql: "
        WITH de_ratios AS (
            SELECT
                f.company_id,
                c.gics_sector_name,
                strftime('%Y', f.period_end_date) AS year,
                f.total_debt / f.revenue AS de_ratio
            FROM financials f
            JOIN companies c ON f.company_id = c.company_id
            WHERE f.period_type = 'ANNUAL'
              AND c.gics_sector_name != :excluded_sector
              AND f.total_debt IS NOT NULL
              AND f.revenue > 0
        ),
        deleveraging AS (
            SELECT
                gics_sector_name,
                year,
                de_ratio,
                LAG(de_ratio, 1) OVER (PARTITION BY company_id ORDER BY year) AS de_prev1,
                LAG(de_ratio, 2) OVER (PARTITION BY company_id ORDER BY year) AS de_prev2
            FROM de_ratios
        )
        SELECT
            year,
            gics_sector_name,
            COUNT(*) AS deleveraging_companies
        FROM deleveraging
        WHERE de_ratio < de_prev1 AND de_prev1 < de_prev2
        GROUP BY year, gics_sector_name
        ORDER BY year, deleveraging_companies DESC",
};

pub const ICR_RATE_SENSITIVITY: NamedQuery = NamedQuery {
    name: "uc2_q3_icr_rate_sensitivity",
    title: "Rolling five-year correlation of interest coverage with the policy rate",
    sql: "
        WITH icr_data AS (
            SELECT
                f.company_id,
                c.company_name,
                c.country_id,
                c.gics_sector_name,
                CAST(strftime('%Y', f.period_end_date) AS INTEGER) AS year,
                f.ebitda / f.interest_expense AS interest_coverage_ratio
            FROM financials f
            JOIN companies c ON f.company_id = c.company_id
            WHERE f.period_type = 'ANNUAL'
              AND c.gics_sector_name != :excluded_sector
              AND f.ebitda IS NOT NULL
              AND f.interest_expense > 0
        ),
        policy_rates AS (
            SELECT
                CAST(strftime('%Y', rate_date) AS INTEGER) AS year,
                country_id,
                AVG(rate_value) AS avg_policy_rate
            FROM interest_rates
            WHERE rate_type = 'POLICY_RATE'
            GROUP BY strftime('%Y', rate_date), country_id
        ),
        combined AS (
            SELECT i.*, p.avg_policy_rate
            FROM icr_data i
            JOIN policy_rates p ON i.year = p.year AND i.country_id = p.country_id
        ),
        rolling AS (
            SELECT
                c1.company_id,
                c1.company_name,
                c1.gics_sector_name,
                c1.country_id,
                c1.year,
                AVG(c2.interest_coverage_ratio) AS avg_icr,
                AVG(c2.avg_policy_rate) AS avg_rate,
                AVG(c2.interest_coverage_ratio * c2.avg_policy_rate) AS avg_icr_rate_product,
                AVG(c2.interest_coverage_ratio * c2.interest_coverage_ratio) AS avg_icr_squared,
                AVG(c2.avg_policy_rate * c2.avg_policy_rate) AS avg_rate_squared
            FROM combined c1
            JOIN combined c2 ON c1.company_id = c2.company_id
                             AND c2.year BETWEEN (c1.year - 4) AND c1.year
            GROUP BY c1.company_id, c1.company_name, c1.gics_sector_name, c1.country_id, c1.year
            HAVING COUNT(c2.year) = 5
        ),
        correlation_calc AS (
            SELECT
                company_id, company_name, gics_sector_name, country_id, year, avg_icr,
                CASE
                    WHEN (avg_icr_squared - avg_icr * avg_icr) > 0
                     AND (avg_rate_squared - avg_rate * avg_rate) > 0
                    THEN (avg_icr_rate_product - avg_icr * avg_rate) /
                         (SQRT(avg_icr_squared - avg_icr * avg_icr) *
                          SQRT(avg_rate_squared - avg_rate * avg_rate))
                END AS rolling_correlation
            FROM rolling
        ),
        latest_correlation AS (
            SELECT
                c.company_id,
                MAX(c.year) AS latest_year,
                COUNT(DISTINCT cm.year) AS total_years_data
            FROM correlation_calc c
            JOIN combined cm ON c.company_id = cm.company_id
            GROUP BY c.company_id
            HAVING COUNT(DISTINCT cm.year) >= 10
        )
        SELECT
            cc.company_name,
            cc.gics_sector_name,
            cc.country_id,
            lc.total_years_data,
            ROUND(cc.avg_icr, 2) AS avg_icr_recent_5y,
            ROUND(cc.rolling_correlation, 4) AS correlation_with_policy_rate,
            CASE
                WHEN cc.rolling_correlation < -0.3 THEN 'Highly Rate-Sensitive'
                WHEN cc.rolling_correlation < 0 THEN 'Moderately Rate-Sensitive'
                WHEN cc.rolling_correlation < 0.3 THEN 'Rate-Insulated'
                ELSE 'Positively Correlated'
            END AS rate_sensitivity_classification
        FROM latest_correlation lc
        JOIN correlation_calc cc ON lc.company_id = cc.company_id AND lc.latest_year = cc.year
        WHERE cc.rolling_correlation IS NOT NULL
        ORDER BY cc.rolling_correlation
        LIMIT 100",
};

pub const ZOMBIE_COMPANIES: NamedQuery = NamedQuery {
    name: "uc3_q1_zombie_companies",
    title: "Companies below the distress coverage ratio, per year and sector",
    sql: "
        WITH icr_data AS (
            SELECT
                c.gics_sector_name,
                strftime('%Y', f.period_end_date) AS year,
                f.ebitda / f.interest_expense AS icr
            FROM financials f
            JOIN companies c ON f.company_id = c.company_id
            WHERE f.period_type = 'ANNUAL'
              AND c.gics_sector_name != :excluded_sector
              AND f.ebitda IS NOT NULL
              AND f.interest_expense > 0
        )
        SELECT
            year,
            gics_sector_name,
            COUNT(*) AS zombie_count
        FROM icr_data
        WHERE icr < :distress_icr
        GROUP BY year, gics_sector_name
        ORDER BY year, zombie_count DESC",
};

pub const RATE_SHOCK_STRESS_TEST: NamedQuery = NamedQuery {
    name: "uc3_q2_rate_shock_stress_test",
    title: "Interest coverage before and after a rate shock on floating debt",
    sql: "
        WITH current_financials AS (
            SELECT
                c.country_id,
                f.ebitda,
                f.interest_expense,
                f.total_debt,
                f.ebitda / f.interest_expense AS current_icr
            FROM financials f
            JOIN companies c ON f.company_id = c.company_id
            WHERE f.period_type = 'ANNUAL'
              AND c.gics_sector_name != :excluded_sector
              AND f.ebitda IS NOT NULL
              AND f.interest_expense > 0
              AND f.total_debt IS NOT NULL
              AND strftime('%Y', f.period_end_date) = :stress_year
        ),
        stress_test AS (
            SELECT
                country_id,
                current_icr,
                ebitda / (interest_expense + (total_debt * :floating_share * :rate_shock)) AS shocked_icr
            FROM current_financials
        )
        SELECT
            country_id,
            COUNT(*) AS companies,
            ROUND(AVG(current_icr), 2) AS current_icr,
            ROUND(AVG(shocked_icr), 2) AS shocked_icr,
            SUM(CASE WHEN current_icr >= :distress_icr AND shocked_icr < :distress_icr
                     THEN 1 ELSE 0 END) AS newly_distressed
        FROM stress_test
        GROUP BY country_id
        HAVING COUNT(*) >= :min_companies
        ORDER BY companies DESC",
};

pub const REVENUE_VOLATILITY: NamedQuery = NamedQuery {
    name: "uc4_q2_revenue_volatility",
    title: "Revenue growth volatility quartiles",
    sql: "
        WITH revenue_growth AS (
            SELECT
                f.company_id,
                CAST(strftime('%Y', f.period_end_date) AS INTEGER) AS year,
                (f.revenue - LAG(f.revenue, 1) OVER (PARTITION BY f.company_id ORDER BY f.period_end_date))
                    / NULLIF(LAG(f.revenue, 1) OVER (PARTITION BY f.company_id ORDER BY f.period_end_date), 0)
                    * 100 AS rev_growth
            FROM financials f
            WHERE f.period_type = 'ANNUAL'
              AND f.revenue IS NOT NULL
        ),
        rolling_volatility AS (
            SELECT
                rg1.company_id,
                rg1.year,
                AVG(rg2.rev_growth) AS avg_growth_10y,
                SQRT(AVG(rg2.rev_growth * rg2.rev_growth) - AVG(rg2.rev_growth) * AVG(rg2.rev_growth))
                    AS rolling_volatility
            FROM revenue_growth rg1
            JOIN revenue_growth rg2 ON rg1.company_id = rg2.company_id
                                   AND rg2.year BETWEEN (rg1.year - 9) AND rg1.year
                                   AND rg2.rev_growth IS NOT NULL
            WHERE rg1.rev_growth IS NOT NULL
            GROUP BY rg1.company_id, rg1.year
            HAVING COUNT(rg2.year) = 10
        ),
        latest_volatility AS (
            SELECT company_id, MAX(year) AS latest_year
            FROM rolling_volatility
            GROUP BY company_id
        ),
        company_volatility AS (
            SELECT
                rv.company_id,
                rv.rolling_volatility AS volatility,
                rv.avg_growth_10y AS avg_growth
            FROM latest_volatility lv
            JOIN rolling_volatility rv ON lv.company_id = rv.company_id AND lv.latest_year = rv.year
            WHERE rv.rolling_volatility IS NOT NULL
        ),
        quartiles AS (
            SELECT *, NTILE(4) OVER (ORDER BY volatility) AS volatility_quartile
            FROM company_volatility
        )
        SELECT
            volatility_quartile,
            CASE volatility_quartile
                WHEN 1 THEN 'Low Volatility (Defensive)'
                WHEN 2 THEN 'Below Average'
                WHEN 3 THEN 'Above Average'
                WHEN 4 THEN 'High Volatility (Cyclical)'
            END AS classification,
            COUNT(*) AS company_count,
            ROUND(AVG(volatility), 2) AS avg_volatility,
            ROUND(AVG(avg_growth), 2) AS avg_growth_rate
        FROM quartiles
        GROUP BY volatility_quartile
        ORDER BY volatility_quartile",
};

pub const INFLATION_REGIMES: NamedQuery = NamedQuery {
    name: "uc5_q1_sector_inflation_performance",
    title: "Months spent in each inflation regime",
    sql: "
        WITH monthly_cpi AS (
            SELECT
                country_id,
                (indicator_value - LAG(indicator_value, 12) OVER (PARTITION BY country_id, indicator_name
                                                                   ORDER BY indicator_date))
                    / NULLIF(LAG(indicator_value, 12) OVER (PARTITION BY country_id, indicator_name
                                                             ORDER BY indicator_date), 0) * 100 AS cpi_yoy
            FROM macro_indicators
            WHERE indicator_category = 'CPI'
              AND indicator_name LIKE '%CPI%'
        )
        SELECT
            CASE WHEN cpi_yoy > :inflation_threshold THEN 'High Inflation' ELSE 'Low Inflation' END AS regime,
            COUNT(*) AS months,
            ROUND(AVG(cpi_yoy), 2) AS avg_cpi_yoy
        FROM monthly_cpi
        WHERE cpi_yoy IS NOT NULL
        GROUP BY regime
        ORDER BY regime",
};

/// Every exported query, in report order.
pub const EXPORT_QUERIES: [NamedQuery; 9] = [
    TOP10_CONCENTRATION,
    HHI_CONCENTRATION,
    DEBT_TO_REVENUE,
    DELEVERAGING_CYCLES,
    ICR_RATE_SENSITIVITY,
    ZOMBIE_COMPANIES,
    RATE_SHOCK_STRESS_TEST,
    REVENUE_VOLATILITY,
    INFLATION_REGIMES,
];

// Chart datasets

pub const DELEVERAGING_SHARE: NamedQuery = NamedQuery {
    name: "deleveraging_share",
    title: "Share of companies cutting debt two years running",
    sql: "
        WITH yearly_debt AS (
            SELECT
                strftime('%Y', f.period_end_date) AS year,
                f.total_debt,
                LAG(f.total_debt, 1) OVER (PARTITION BY f.company_id ORDER BY f.period_end_date) AS prev1,
                LAG(f.total_debt, 2) OVER (PARTITION BY f.company_id ORDER BY f.period_end_date) AS prev2
            FROM financials f
            JOIN companies c ON f.company_id = c.company_id
            WHERE f.period_type = 'ANNUAL'
              AND c.gics_sector_name != :excluded_sector
              AND f.total_debt IS NOT NULL
        ),
        deleveraging AS (
            SELECT year, CASE WHEN total_debt < prev1 AND prev1 < prev2 THEN 1 ELSE 0 END AS is_delev
            FROM yearly_debt
            WHERE prev2 IS NOT NULL
        )
        SELECT
            year,
            COUNT(*) AS companies,
            SUM(is_delev) AS deleveraging,
            ROUND(SUM(is_delev) * 100.0 / COUNT(*), 1) AS pct
        FROM deleveraging
        GROUP BY year
        ORDER BY year",
};

pub const SECTOR_VOLATILITY: NamedQuery = NamedQuery {
    name: "sector_revenue_volatility",
    title: "Average revenue growth volatility by sector",
    sql: "
        WITH rev_growth AS (
            SELECT
                f.company_id,
                c.gics_sector_name,
                (f.revenue - LAG(f.revenue) OVER (PARTITION BY f.company_id ORDER BY f.period_end_date))
                    / NULLIF(LAG(f.revenue) OVER (PARTITION BY f.company_id ORDER BY f.period_end_date), 0)
                    * 100 AS growth
            FROM financials f
            JOIN companies c ON f.company_id = c.company_id
            WHERE f.period_type = 'ANNUAL'
              AND f.revenue IS NOT NULL
              AND c.gics_sector_name IS NOT NULL
        ),
        volatility AS (
            SELECT
                company_id,
                gics_sector_name,
                SQRT(ABS(AVG(growth * growth) - AVG(growth) * AVG(growth))) AS vol
            FROM rev_growth
            WHERE growth IS NOT NULL
            GROUP BY company_id, gics_sector_name
            HAVING COUNT(*) >= 10
        )
        SELECT
            gics_sector_name,
            COUNT(*) AS companies,
            AVG(vol) AS avg_vol,
            MIN(vol) AS min_vol,
            MAX(vol) AS max_vol
        FROM volatility
        GROUP BY gics_sector_name
        ORDER BY avg_vol",
};

pub const SECTOR_INFLATION_RETURNS: NamedQuery = NamedQuery {
    name: "sector_returns_by_inflation_regime",
    title: "Annualized sector returns by inflation regime",
    sql: "
        WITH monthly_cpi AS (
            SELECT
                strftime('%Y-%m', indicator_date) AS ym,
                CASE WHEN AVG(indicator_value) > :inflation_threshold
                     THEN 'High Inflation' ELSE 'Low Inflation' END AS regime
            FROM macro_indicators
            WHERE indicator_name LIKE '%CPI%yoy%' AND country_id = :country
            GROUP BY strftime('%Y-%m', indicator_date)
        ),
        sector_returns AS (
            SELECT
                strftime('%Y-%m', p.price_date) AS ym,
                c.gics_sector_name AS sector,
                AVG(p.total_return) * 52 AS ann_return
            FROM prices_weekly p
            JOIN companies c ON p.company_id = c.company_id
            WHERE c.gics_sector_name IS NOT NULL AND c.country_id = :country
            GROUP BY strftime('%Y-%m', p.price_date), c.gics_sector_name
        )
        SELECT cpi.regime, sr.sector, AVG(sr.ann_return) AS ann_return
        FROM monthly_cpi cpi
        JOIN sector_returns sr ON cpi.ym = sr.ym
        GROUP BY cpi.regime, sr.sector
        ORDER BY sr.sector, cpi.regime",
};

pub const SECTOR_RATE_SENSITIVITY: NamedQuery = NamedQuery {
    name: "sector_rate_sensitivity",
    title: "Covariance of weekly sector returns with 10Y yield changes",
    sql: "
        WITH yield_chg AS (
            SELECT rate_date, rate_value - LAG(rate_value) OVER (ORDER BY rate_date) AS chg
            FROM interest_rates
            WHERE country_id = :country AND rate_type = '10Y_YIELD'
        ),
        sector_ret AS (
            SELECT p.price_date, c.gics_sector_name, AVG(p.total_return) AS ret
            FROM prices_weekly p
            JOIN companies c ON p.company_id = c.company_id
            WHERE c.gics_sector_name IS NOT NULL AND c.country_id = :country
            GROUP BY p.price_date, c.gics_sector_name
        ),
        combined AS (
            SELECT sr.gics_sector_name, sr.ret, yc.chg
            FROM sector_ret sr
            JOIN yield_chg yc ON sr.price_date = yc.rate_date
            WHERE yc.chg IS NOT NULL AND sr.ret IS NOT NULL
        )
        SELECT gics_sector_name, AVG(ret * chg) - AVG(ret) * AVG(chg) AS sensitivity
        FROM combined
        GROUP BY gics_sector_name
        ORDER BY sensitivity",
};

pub const COMPANIES_BY_SECTOR: NamedQuery = NamedQuery {
    name: "companies_by_sector",
    title: "Largest sectors by company count",
    sql: "
        SELECT gics_sector_name, COUNT(*) AS cnt
        FROM companies
        WHERE gics_sector_name IS NOT NULL
        GROUP BY gics_sector_name
        ORDER BY cnt DESC
        LIMIT 6",
};

pub const FINANCIAL_COVERAGE: NamedQuery = NamedQuery {
    name: "financial_coverage",
    title: "Companies with annual financials per year",
    sql: "
        SELECT strftime('%Y', period_end_date) AS year, COUNT(DISTINCT company_id) AS companies
        FROM financials
        WHERE period_type = 'ANNUAL'
        GROUP BY year
        ORDER BY year",
};

pub const YIELD_HISTORY: NamedQuery = NamedQuery {
    name: "ten_year_yield_history",
    title: "Average 10Y yield per year",
    sql: "
        SELECT strftime('%Y', rate_date) AS year, AVG(rate_value) AS rate
        FROM interest_rates
        WHERE country_id = :country AND rate_type = '10Y_YIELD'
        GROUP BY year
        ORDER BY year",
};

pub const MACRO_COVERAGE: NamedQuery = NamedQuery {
    name: "macro_coverage",
    title: "Distinct macro indicators per country",
    sql: "
        SELECT country_id, COUNT(DISTINCT indicator_name) AS indicators
        FROM macro_indicators
        GROUP BY country_id
        ORDER BY country_id",
};

/// Chart datasets, in no particular order.
pub const CHART_QUERIES: [NamedQuery; 8] = [
    DELEVERAGING_SHARE,
    SECTOR_VOLATILITY,
    SECTOR_INFLATION_RETURNS,
    SECTOR_RATE_SENSITIVITY,
    COMPANIES_BY_SECTOR,
    FINANCIAL_COVERAGE,
    YIELD_HISTORY,
    MACRO_COVERAGE,
];
